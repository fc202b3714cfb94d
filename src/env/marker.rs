// src/env/marker.rs

//! Environment staleness tracking.
//!
//! A provisioned environment carries a marker file whose modification time
//! is compared against the project's dependency declarations.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use globset::{Glob, GlobMatcher};
use tracing::{debug, warn};

use crate::config::Config;
use crate::fs::FileSystem;

use super::context::Context;

/// Marker file name inside each environment.
pub const TIMESTAMP: &str = "multirun.timestamp";

const REQUIREMENTS_GLOB: &str = "requirements*.txt";

fn requirements_matcher() -> Option<GlobMatcher> {
    Glob::new(REQUIREMENTS_GLOB).ok().map(|g| g.compile_matcher())
}

/// Requirement files for the project: the configured ones, or every
/// `requirements*.txt` at the project root.
pub fn project_requirements(config: &Config, fs: &dyn FileSystem) -> Vec<PathBuf> {
    if !config.requirements.is_empty() {
        return config.requirements.iter().map(|r| config.root.join(r)).collect();
    }

    let Some(matcher) = requirements_matcher() else {
        return Vec::new();
    };
    match fs.read_dir(&config.root) {
        Ok(entries) => entries
            .into_iter()
            .filter(|path| {
                path.file_name().is_some_and(|name| matcher.is_match(name)) && fs.is_file(path)
            })
            .collect(),
        Err(err) => {
            debug!(error = %err, "could not list project root");
            Vec::new()
        }
    }
}

/// Files whose changes invalidate an environment.
pub fn dependency_inputs(config: &Config, fs: &dyn FileSystem) -> Vec<PathBuf> {
    let mut inputs = vec![config.pyproject_path()];
    inputs.extend(project_requirements(config, fs));
    inputs
}

/// Whether `context`'s environment must be (re)built.
///
/// Stale when the marker is missing or older than any dependency input.
/// Any error while checking counts as stale.
pub fn needs_update(context: &Context, config: &Config, fs: &dyn FileSystem) -> bool {
    match check_marker(context, config, fs) {
        Ok(stale) => stale,
        Err(err) => {
            warn!(venv = %context.venv.display(), error = %err, "failed to read environment timestamps");
            true
        }
    }
}

fn check_marker(context: &Context, config: &Config, fs: &dyn FileSystem) -> Result<bool> {
    let marker = context.venv.join(TIMESTAMP);
    if !fs.is_file(&marker) {
        debug!(venv = %context.venv.display(), "no timestamp marker");
        return Ok(true);
    }
    let base = fs.modified(&marker)?;

    for input in dependency_inputs(config, fs) {
        if !fs.exists(&input) {
            continue;
        }
        if fs.modified(&input)? > base {
            debug!(input = %input.display(), "dependency input changed");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Record a successful provisioning.
pub fn write_marker(context: &Context, fs: &dyn FileSystem) -> Result<()> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    fs.write(&context.venv.join(TIMESTAMP), format!("{nanos}\n").as_bytes())
}
