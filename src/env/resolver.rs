// src/env/resolver.rs

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{MultirunError, Result};
use crate::types::{Builder, Options};
use crate::version::{Version, matches, version_match};

use super::context::{Context, venv_path};
use super::probe::{RuntimeProbe, runtime_candidates};

/// Name of the fast external installer.
pub const UV: &str = "uv";

/// Interpreter names tried for the host's default runtime.
const HOST_RUNTIMES: &[&str] = &["python3", "python"];

/// Pick the concrete builder for this host.
///
/// `Auto` prefers `uv` when it is on `PATH`. Requesting `uv` explicitly when
/// it is missing is a configuration error.
pub fn select_builder(preference: Builder, probe: &dyn RuntimeProbe) -> Result<Builder> {
    let has_uv = || probe.which(UV, None).is_some();
    match preference {
        Builder::Auto if has_uv() => Ok(Builder::Uv),
        Builder::Auto | Builder::Pip => Ok(Builder::Pip),
        Builder::Uv if has_uv() => Ok(Builder::Uv),
        Builder::Uv => Err(MultirunError::BuilderUnavailable(UV.to_string())),
    }
}

/// Find an interpreter on `PATH` compatible with `version`.
///
/// Returns the binary and the version it actually reports.
pub async fn find_runtime(version: &Version, probe: &dyn RuntimeProbe) -> Option<(PathBuf, Version)> {
    for name in runtime_candidates(version) {
        let Some(binary) = probe.which(&name, None) else {
            debug!(%name, "not on PATH");
            continue;
        };
        let Some(found) = probe.version(&binary).await else {
            continue;
        };
        if matches(&found, version) {
            return Some((binary, found));
        }
        debug!(binary = %binary.display(), %found, wanted = %version, "version mismatch");
    }
    None
}

/// The host's default interpreter.
pub async fn host_runtime(probe: &dyn RuntimeProbe) -> Option<(PathBuf, Version)> {
    for name in HOST_RUNTIMES {
        if let Some(binary) = probe.which(name, None)
            && let Some(version) = probe.version(&binary).await
        {
            return Some((binary, version));
        }
    }
    None
}

/// Build one context per runtime the run should target.
///
/// Live mode (or a config without `python_versions`) yields a single live
/// context for the host interpreter, with its path left for provisioning to
/// fill in. With `uv`, interpreters are materialized by the builder, so
/// paths stay unresolved as well. Otherwise each requested version is
/// searched on `PATH`; versions that are not found are logged and skipped.
pub async fn resolve_contexts(
    config: &Config,
    options: &Options,
    probe: &dyn RuntimeProbe,
) -> Result<Vec<Context>> {
    if options.live || config.versions.is_empty() {
        let (_, version) = host_runtime(probe).await.ok_or(MultirunError::NoRuntime)?;
        let builder = select_builder(config.builder, probe)?;
        let mut context = Context::new(version.clone(), None, venv_path(&config.root, &version), builder);
        context.live = true;
        info!(version = %version, "using live runtime");
        return Ok(vec![context]);
    }

    let builder = select_builder(config.builder, probe)?;
    let mut contexts: Vec<Context> = Vec::new();
    let mut missing: Vec<String> = Vec::new();

    for version in &config.versions {
        let context = match builder {
            Builder::Uv => Context::new(version.clone(), None, venv_path(&config.root, version), builder),
            _ => match find_runtime(version, probe).await {
                Some((binary, found)) => {
                    let venv = venv_path(&config.root, &found);
                    Context::new(found, Some(binary), venv, builder)
                }
                None => {
                    missing.push(version.to_string());
                    continue;
                }
            },
        };
        if contexts.iter().any(|c| c.version == context.version) {
            debug!(version = %context.version, "runtime already selected");
            continue;
        }
        contexts.push(context);
    }

    if !missing.is_empty() {
        warn!(?missing, "missing Python versions");
    }

    let available: Vec<Version> = contexts.iter().map(|c| c.version.clone()).collect();
    info!(
        available = ?available.iter().map(ToString::to_string).collect::<Vec<_>>(),
        %builder,
        "resolved runtimes"
    );

    if let Some(wanted) = &options.python {
        let selected = version_match(&available, wanted);
        contexts.retain(|c| selected.contains(&c.version));
    }

    Ok(contexts)
}
