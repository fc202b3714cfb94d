use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use multirun::env::RuntimeProbe;
use multirun::types::BoxFuture;
use multirun::version::Version;

/// Table-driven `RuntimeProbe`:
/// - `which(name, None)` looks `name` up in a PATH table,
/// - `which(name, Some(dir))` succeeds for registered `dir/name` files,
/// - `version(path)` answers from a path → version table and records the
///   call.
#[derive(Debug, Clone, Default)]
pub struct FakeProbe {
    on_path: HashMap<String, PathBuf>,
    files: HashSet<PathBuf>,
    versions: HashMap<PathBuf, Version>,
    version_calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` on PATH at `path`, reporting `version`.
    pub fn with_runtime(mut self, name: &str, path: &str, version: &str) -> Self {
        let path = PathBuf::from(path);
        self.on_path.insert(name.to_string(), path.clone());
        self.versions
            .insert(path, version.parse().expect("valid version in fake probe"));
        self
    }

    /// Register a non-interpreter tool (e.g. `uv`) on PATH.
    pub fn with_tool(mut self, name: &str, path: &str) -> Self {
        self.on_path.insert(name.to_string(), PathBuf::from(path));
        self
    }

    /// Register an interpreter file inside a directory, e.g. a venv's `bin`.
    pub fn with_file(mut self, path: &str, version: Option<&str>) -> Self {
        let path = PathBuf::from(path);
        self.files.insert(path.clone());
        if let Some(version) = version {
            self.versions
                .insert(path, version.parse().expect("valid version in fake probe"));
        }
        self
    }

    pub fn version_calls(&self) -> Vec<PathBuf> {
        self.version_calls.lock().unwrap().clone()
    }
}

impl RuntimeProbe for FakeProbe {
    fn which(&self, name: &str, search: Option<&Path>) -> Option<PathBuf> {
        match search {
            None => self.on_path.get(name).cloned(),
            Some(dir) => {
                let path = dir.join(name);
                self.files.contains(&path).then_some(path)
            }
        }
    }

    fn version(&self, binary: &Path) -> BoxFuture<'_, Option<Version>> {
        self.version_calls.lock().unwrap().push(binary.to_path_buf());
        let version = self.versions.get(binary).cloned();
        Box::pin(async move { version })
    }
}
