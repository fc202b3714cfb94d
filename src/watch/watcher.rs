// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, trace, warn};

use crate::watch::activity::ActivityClock;
use crate::watch::patterns::{IgnoreRules, relative_str};

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping it stops
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// What a single changed path means for the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathChange {
    Config,
    Activity,
    Ignored,
}

/// Decides which changed paths count, and how.
///
/// The config file always counts, even when it lies outside every watched
/// path; anything else must be under a watched path and not ignored.
#[derive(Debug)]
pub struct ChangeFilter {
    root: PathBuf,
    config_path: PathBuf,
    watched: Vec<PathBuf>,
    rules: IgnoreRules,
}

impl ChangeFilter {
    pub fn new(root: impl Into<PathBuf>, watched: Vec<PathBuf>, rules: IgnoreRules) -> Self {
        let root = root.into();
        let config_path = root.join(crate::config::PYPROJECT);
        Self {
            root,
            config_path,
            watched,
            rules,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Whether the recursive watches already cover the config file.
    fn covers_config(&self) -> bool {
        self.watched.iter().any(|w| self.config_path.starts_with(w))
    }

    pub fn classify(&self, path: &Path) -> PathChange {
        if path == self.config_path {
            return PathChange::Config;
        }
        if !self.watched.iter().any(|w| path.starts_with(w)) {
            return PathChange::Ignored;
        }
        match relative_str(&self.root, path) {
            Some(rel) if self.rules.is_ignored(&rel) => PathChange::Ignored,
            // Explicit watch paths may live outside the project.
            _ => PathChange::Activity,
        }
    }

    /// Apply one notify event to the activity clock.
    pub fn record(&self, clock: &ActivityClock, event: &Event) {
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }
        for path in &event.paths {
            match self.classify(path) {
                PathChange::Config => {
                    debug!(path = %path.display(), "config file changed");
                    clock.mark_config_changed();
                }
                PathChange::Activity => {
                    trace!(path = %path.display(), "activity");
                    clock.touch();
                }
                PathChange::Ignored => {}
            }
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Watch `paths` recursively, plus the project's config file, and record
/// qualifying changes on `clock`.
///
/// The notify callback runs on the watcher's own thread and only touches
/// atomics, so no channel into the async world is needed.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    paths: &[PathBuf],
    rules: IgnoreRules,
    clock: Arc<ActivityClock>,
) -> Result<WatcherHandle> {
    let root = canonical(&root.into());
    let watched: Vec<PathBuf> = paths.iter().map(|p| canonical(p)).collect();
    let filter = Arc::new(ChangeFilter::new(root, watched.clone(), rules));

    let mut watcher = RecommendedWatcher::new(
        {
            let filter = Arc::clone(&filter);
            move |res: notify::Result<Event>| match res {
                Ok(event) => filter.record(&clock, &event),
                Err(err) => warn!(error = %err, "file watch error"),
            }
        },
        Config::default(),
    )?;

    for path in &watched {
        watcher.watch(path, RecursiveMode::Recursive)?;
        info!("file watcher started on {:?}", path);
    }

    // Editors often replace the file, so watch its directory, not the inode.
    if !filter.covers_config()
        && let Some(dir) = filter.config_path().parent()
    {
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        debug!(dir = %dir.display(), "watching config directory");
    }

    Ok(WatcherHandle { _inner: watcher })
}
