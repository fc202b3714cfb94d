// src/env/context.rs

use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::Builder;
use crate::version::Version;

/// Per-project state directory, relative to the project root.
pub const STATE_DIR: &str = ".multirun";

/// One target runtime version plus its isolated environment.
///
/// Contexts are values: provisioning never mutates a shared context, it
/// publishes a finalized copy (see [`Context::with_interpreter`]) in
/// `Event::VenvReady`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Context {
    pub version: Version,
    /// Interpreter used to build the environment. `None` until known, e.g.
    /// for live contexts or when `uv` materializes the runtime itself.
    pub interpreter: Option<PathBuf>,
    pub venv: PathBuf,
    /// Resolved builder; never `Builder::Auto`.
    pub builder: Builder,
    pub live: bool,
}

impl Context {
    pub fn new(version: Version, interpreter: Option<PathBuf>, venv: PathBuf, builder: Builder) -> Self {
        Self {
            version,
            interpreter,
            venv,
            builder,
            live: false,
        }
    }

    /// Executable directory inside the environment.
    pub fn bin_dir(&self) -> PathBuf {
        venv_bin_path(&self.venv)
    }

    /// Interpreter inside the environment (exists once provisioned).
    pub fn venv_python(&self) -> PathBuf {
        self.bin_dir()
            .join(format!("python{}", std::env::consts::EXE_SUFFIX))
    }

    /// The finalized context once the environment's own interpreter is known.
    pub fn with_interpreter(&self, interpreter: PathBuf, version: Option<Version>) -> Self {
        Self {
            version: version.unwrap_or_else(|| self.version.clone()),
            interpreter: Some(interpreter),
            ..self.clone()
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

/// `<root>/.multirun/venv/<version>`
pub fn venv_path(root: &Path, version: &Version) -> PathBuf {
    root.join(STATE_DIR).join("venv").join(version.to_string())
}

pub fn venv_bin_path(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts")
    } else {
        venv.join("bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalized_context_keeps_environment() {
        let version: Version = "3.11".parse().unwrap();
        let venv = venv_path(Path::new("/p"), &version);
        assert_eq!(venv, PathBuf::from("/p/.multirun/venv/3.11"));

        let context = Context::new(version.clone(), None, venv.clone(), Builder::Uv);
        let ready = context.with_interpreter(context.venv_python(), "3.11.4".parse().ok());
        assert_eq!(ready.venv, venv);
        assert_eq!(ready.builder, Builder::Uv);
        assert_eq!(ready.version.to_string(), "3.11.4");
        assert_eq!(ready.interpreter, Some(context.venv_python()));
        assert_ne!(ready, context);
    }
}
