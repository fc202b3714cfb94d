// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Job and command failures are *not* errors: they travel as
//! [`Event::Result`](crate::engine::Event) values with a non-zero exit code.
//! Everything in here aborts a run before (or instead of) executing jobs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MultirunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("unknown job {0:?}")]
    UnknownJob(String),

    #[error("job requirements form a cycle: {0}")]
    JobCycle(String),

    #[error("unknown field {{{field}}} in command template {template:?}")]
    TemplateField { template: String, field: String },

    #[error("malformed command template {0:?}")]
    MalformedTemplate(String),

    #[error("builder {0:?} was requested but is not available on PATH")]
    BuilderUnavailable(String),

    #[error("no Python runtime available")]
    NoRuntime,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MultirunError {
    /// Whether this error stems from the project configuration (as opposed to
    /// IO or the host environment).
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MultirunError::ConfigError(_)
                | MultirunError::UnknownJob(_)
                | MultirunError::JobCycle(_)
                | MultirunError::TemplateField { .. }
                | MultirunError::MalformedTemplate(_)
                | MultirunError::BuilderUnavailable(_)
                | MultirunError::TomlError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MultirunError>;
