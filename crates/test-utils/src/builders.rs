#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use multirun::config::{Config, Job, validate_config};
use multirun::env::{Context, venv_path};
use multirun::types::Builder;
use multirun::version::Version;

/// Builder for `Config` to simplify test setup.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            config: Config::new(root),
        }
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.config.jobs.insert(job.name.clone(), Arc::new(job));
        self
    }

    pub fn with_default(mut self, name: &str) -> Self {
        self.config.default.push(name.to_lowercase());
        self
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.config.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.config
            .versions
            .push(version.parse().expect("valid version in test config"));
        self
    }

    pub fn with_builder(mut self, builder: Builder) -> Self {
        self.config.builder = builder;
        self
    }

    pub fn build(self) -> Config {
        validate_config(&self.config).expect("Failed to build valid config from builder");
        self.config
    }
}

/// Builder for `Job`.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(name: &str, run: &[&str]) -> Self {
        Self {
            job: Job::new(name, run.iter().copied()),
        }
    }

    pub fn requires(mut self, dep: &str) -> Self {
        self.job.requires.push(dep.to_lowercase());
        self
    }

    pub fn once(mut self) -> Self {
        self.job.once = true;
        self
    }

    pub fn parallel(mut self) -> Self {
        self.job.parallel = true;
        self
    }

    pub fn show_output(mut self) -> Self {
        self.job.show_output = true;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// A context rooted under `root`, as the resolver would produce for `pip`.
pub fn context(root: &std::path::Path, version: &str) -> Context {
    let version: Version = version.parse().expect("valid version in test context");
    let venv = venv_path(root, &version);
    Context::new(version, None, venv, Builder::Pip)
}
