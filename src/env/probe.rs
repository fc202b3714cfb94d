// src/env/probe.rs

//! Interpreter discovery.
//!
//! The resolver and provisioner only talk to a [`RuntimeProbe`]; production
//! code uses [`SystemProbe`], tests provide a table-driven fake.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::types::BoxFuture;
use crate::version::Version;

static PYTHON_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Python (\d+\.\d+\S*)").expect("python version regex is valid"));

/// How long `<binary> -V` may take before the binary is given up on.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Lookups the environment layer needs from the host.
pub trait RuntimeProbe: Send + Sync + Debug {
    /// Find an executable by name, in `search` if given, else on `PATH`.
    fn which(&self, name: &str, search: Option<&Path>) -> Option<PathBuf>;

    /// Version reported by an interpreter binary, or `None` if it cannot be
    /// determined. Never fails.
    fn version(&self, binary: &Path) -> BoxFuture<'_, Option<Version>>;
}

/// Memoized interpreter versions, keyed by binary path.
///
/// Each key is populated at most once and never invalidated; one cache lives
/// for one top-level invocation.
#[derive(Debug, Default)]
pub struct RuntimeCache {
    versions: Mutex<HashMap<PathBuf, Option<Version>>>,
}

impl RuntimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, binary: &Path) -> Option<Option<Version>> {
        let versions = self.versions.lock().unwrap_or_else(|p| p.into_inner());
        versions.get(binary).cloned()
    }

    /// Record a probe result unless one is already present; returns the
    /// cached value.
    pub fn insert(&self, binary: &Path, version: Option<Version>) -> Option<Version> {
        let mut versions = self.versions.lock().unwrap_or_else(|p| p.into_inner());
        versions
            .entry(binary.to_path_buf())
            .or_insert(version)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.versions.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Probe that runs real binaries.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    cache: Arc<RuntimeCache>,
    timeout: Duration,
}

impl SystemProbe {
    pub fn new(cache: Arc<RuntimeCache>) -> Self {
        Self {
            cache,
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn probe(binary: PathBuf, timeout: Duration) -> Option<Version> {
        let mut cmd = Command::new(&binary);
        cmd.arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(binary = %binary.display(), error = %err, "running `-V` failed");
                return None;
            }
            Err(_) => {
                warn!(binary = %binary.display(), "running `-V` timed out");
                return None;
            }
        };

        // Python 2 printed its version on stderr.
        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let version = parse_python_version(&text);
        match &version {
            Some(v) => debug!(binary = %binary.display(), version = %v, "found runtime"),
            None => warn!(
                binary = %binary.display(),
                output = %text.trim(),
                "unexpected version string"
            ),
        }
        version
    }
}

impl RuntimeProbe for SystemProbe {
    fn which(&self, name: &str, search: Option<&Path>) -> Option<PathBuf> {
        find_executable(name, search)
    }

    fn version(&self, binary: &Path) -> BoxFuture<'_, Option<Version>> {
        let binary = binary.to_path_buf();
        Box::pin(async move {
            if let Some(cached) = self.cache.get(&binary) {
                return cached;
            }
            let version = Self::probe(binary.clone(), self.timeout).await;
            self.cache.insert(&binary, version)
        })
    }
}

/// Extract the version from `python -V` output.
pub fn parse_python_version(output: &str) -> Option<Version> {
    let caps = PYTHON_VERSION_RE.captures(output)?;
    caps[1].parse().ok()
}

/// Binary names to try for `version`, most specific first.
pub fn runtime_candidates(version: &Version) -> Vec<String> {
    let mut names = Vec::with_capacity(3);
    if let Some(minor) = version.minor() {
        names.push(format!("python{}.{}", version.major(), minor));
    }
    names.push(format!("python{}", version.major()));
    names.push("python".to_string());
    names
}

/// Look up an executable by name in `dir`, or on `PATH` when `dir` is `None`.
///
/// Names containing a path separator are checked as given.
pub fn find_executable(name: &str, dir: Option<&Path>) -> Option<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }

    let dirs: Vec<PathBuf> = match dir {
        Some(dir) => vec![dir.to_path_buf()],
        None => std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default(),
    };

    let suffix = std::env::consts::EXE_SUFFIX;
    dirs.iter().find_map(|dir| {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if !suffix.is_empty() {
            let candidate = dir.join(format!("{name}{suffix}"));
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
        None
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interpreter_banners() {
        assert_eq!(parse_python_version("Python 3.11.4\n").unwrap().to_string(), "3.11.4");
        assert_eq!(parse_python_version("Python 3.13.0rc2").unwrap().to_string(), "3.13.0rc2");
        assert_eq!(parse_python_version("Python 3.9").unwrap().to_string(), "3.9");
        assert!(parse_python_version("bash: python: command not found").is_none());
    }

    #[test]
    fn candidates_go_from_specific_to_generic() {
        let version: Version = "3.10.2".parse().unwrap();
        assert_eq!(runtime_candidates(&version), ["python3.10", "python3", "python"]);
        let version: Version = "3".parse().unwrap();
        assert_eq!(runtime_candidates(&version), ["python3", "python"]);
    }

    #[test]
    fn cache_keeps_first_value() {
        let cache = RuntimeCache::new();
        let path = Path::new("/usr/bin/python3");
        assert!(cache.get(path).is_none());
        assert_eq!(cache.insert(path, "3.9".parse().ok()).unwrap().to_string(), "3.9");
        assert_eq!(cache.insert(path, None).unwrap().to_string(), "3.9");
        assert_eq!(cache.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn finds_executables_in_given_dir() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        assert!(find_executable("tool", Some(dir.path())).is_none());
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_executable("tool", Some(dir.path())), Some(tool));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_probe_memoizes_failures() {
        let cache = Arc::new(RuntimeCache::new());
        let probe = SystemProbe::new(Arc::clone(&cache));
        let missing = Path::new("/nonexistent/python9.9");
        assert!(probe.version(missing).await.is_none());
        assert_eq!(cache.get(missing), Some(None));
    }
}
