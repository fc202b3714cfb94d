// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::Options;
use crate::version::Version;

/// Command-line arguments for `multirun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "multirun",
    version,
    about = "Run project jobs across multiple Python versions.",
    long_about = None
)]
pub struct CliArgs {
    /// Jobs to run. Defaults to `default` from `[tool.multirun]`.
    #[arg(value_name = "JOB")]
    pub jobs: Vec<String>,

    /// Project directory or `pyproject.toml` to use.
    ///
    /// Default: search upward from the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only run on runtimes matching this (partial) version.
    #[arg(short = 'p', long, alias = "py", value_name = "VERSION", conflicts_with = "live")]
    pub python: Option<Version>,

    /// Use the default host interpreter instead of `python_versions`.
    #[arg(long)]
    pub live: bool,

    /// Re-run whenever project files change.
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// Remove all environments before running.
    #[arg(long)]
    pub clean: bool,

    /// Print timings of each operation after the run.
    #[arg(long)]
    pub benchmark: bool,

    /// Shortcut for `--log-level debug`.
    #[arg(long)]
    pub debug: bool,

    /// List configured jobs and exit.
    #[arg(long)]
    pub list: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MULTIRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    pub fn options(&self) -> Options {
        Options {
            jobs: self.jobs.iter().map(|j| j.to_lowercase()).collect(),
            python: self.python.clone(),
            live: self.live,
            watch: self.watch,
            clean: self.clean,
            benchmark: self.benchmark,
        }
    }

    /// Explicit level, with `--debug` as a fallback.
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        self.log_level.or(self.debug.then_some(LogLevel::Debug))
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
