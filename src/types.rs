use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::Deserialize;

use crate::version::Version;

/// Boxed future used at the trait seams (provisioner, runtime probe).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which tool builds the per-version environments.
///
/// - `Pip`: the interpreter's own `venv` module plus `pip`.
/// - `Uv`: the external `uv` installer, which can also materialize
///   interpreters that are not installed locally.
/// - `Auto` (default): prefer `uv` when it is on PATH, else `pip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Builder {
    #[default]
    Auto,
    Pip,
    Uv,
}

impl FromStr for Builder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Builder::Auto),
            "pip" => Ok(Builder::Pip),
            "uv" => Ok(Builder::Uv),
            other => Err(format!(
                "invalid builder: {other} (expected \"auto\", \"pip\" or \"uv\")"
            )),
        }
    }
}

impl fmt::Display for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Builder::Auto => "auto",
            Builder::Pip => "pip",
            Builder::Uv => "uv",
        };
        f.write_str(name)
    }
}

/// Per-invocation options, usually derived from the command line.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Job names queued to run; empty means "run the configured defaults".
    pub jobs: Vec<String>,
    /// Only run on contexts matching this (partial) version.
    pub python: Option<Version>,
    /// Use the host's default interpreter instead of `python_versions`.
    pub live: bool,
    /// Re-run on filesystem changes.
    pub watch: bool,
    /// Remove all environments before running.
    pub clean: bool,
    /// Print operation timings after the run.
    pub benchmark: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_parses_case_insensitively() {
        assert_eq!("UV".parse::<Builder>(), Ok(Builder::Uv));
        assert_eq!(" pip ".parse::<Builder>(), Ok(Builder::Pip));
        assert!("conda".parse::<Builder>().is_err());
        assert_eq!(Builder::default(), Builder::Auto);
    }
}
