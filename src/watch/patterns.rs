// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// Paths that never trigger a re-run: version control, caches, our own
/// state directory and editor swap files.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".hg",
    ".multirun",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
    ".venv",
    "*.swp",
    "*.swx",
    "*~",
    ".#*",
];

/// Compiled exclusion set, matched against root-relative paths.
#[derive(Clone)]
pub struct IgnoreRules {
    set: GlobSet,
    count: usize,
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("patterns", &self.count)
            .finish_non_exhaustive()
    }
}

/// Expand a gitignore-style pattern into globs matching the path itself and
/// everything below it.
fn expand_pattern(pattern: &str) -> Vec<String> {
    let trimmed = pattern.trim_end_matches('/');
    let anchored = trimmed.starts_with('/') || trimmed.contains('/');
    let base = trimmed.trim_start_matches('/');
    if base.is_empty() {
        return Vec::new();
    }
    let base = if anchored {
        base.to_string()
    } else {
        format!("**/{base}")
    };
    vec![format!("{base}/**"), base]
}

impl IgnoreRules {
    /// Default excludes plus `extra` gitignore-style patterns.
    ///
    /// Invalid extra patterns are skipped with a warning.
    pub fn new(extra: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut count = 0;

        for pattern in DEFAULT_EXCLUDES {
            for glob in expand_pattern(pattern) {
                builder.add(Glob::new(&glob).with_context(|| format!("invalid glob pattern: {glob}"))?);
                count += 1;
            }
        }

        for pattern in extra {
            for glob in expand_pattern(pattern) {
                match Glob::new(&glob) {
                    Ok(glob) => {
                        builder.add(glob);
                        count += 1;
                    }
                    Err(err) => warn!(pattern = %pattern, error = %err, "skipping ignore pattern"),
                }
            }
        }

        Ok(Self {
            set: builder.build()?,
            count,
        })
    }

    /// Default excludes plus the project's `.gitignore`.
    pub fn for_project(root: &Path, fs: &dyn FileSystem) -> Result<Self> {
        let gitignore = root.join(".gitignore");
        let extra = match fs.read_to_string(&gitignore) {
            Ok(contents) => gitignore_patterns(&contents),
            Err(_) => {
                debug!("no .gitignore");
                Vec::new()
            }
        };
        Self::new(&extra)
    }

    /// `rel_path` uses forward slashes and is relative to the project root.
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// Simple patterns from a `.gitignore`: comments, blanks and negations are
/// dropped.
pub fn gitignore_patterns(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(str::to_string)
        .collect()
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Falls back to canonicalized paths when the direct prefix does not match
/// (symlinked temp dirs, `/private/var` on macOS). Returns `None` for paths
/// outside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize())
        && let Ok(rel) = path_canon.strip_prefix(&root_canon)
    {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_cover_nested_paths() {
        let rules = IgnoreRules::new(&[]).unwrap();
        assert!(rules.is_ignored(".git/index"));
        assert!(rules.is_ignored("pkg/__pycache__/mod.cpython-312.pyc"));
        assert!(rules.is_ignored(".multirun/venv/3.12/multirun.timestamp"));
        assert!(rules.is_ignored("src/.main.py.swp"));
        assert!(rules.is_ignored("notes.txt~"));
        assert!(!rules.is_ignored("src/main.py"));
        assert!(!rules.is_ignored("pyproject.toml"));
    }

    #[test]
    fn gitignore_patterns_are_honoured() {
        let extra = gitignore_patterns("# build output\n/dist/\n*.egg-info\n\n!keep.txt\ndocs/_build\n");
        assert_eq!(extra, ["/dist/", "*.egg-info", "docs/_build"]);

        let rules = IgnoreRules::new(&extra).unwrap();
        assert!(rules.is_ignored("dist/pkg-1.0.tar.gz"));
        assert!(!rules.is_ignored("src/dist/file.py"));
        assert!(rules.is_ignored("src/pkg.egg-info/PKG-INFO"));
        assert!(rules.is_ignored("docs/_build/index.html"));
        assert!(!rules.is_ignored("docs/index.rst"));
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/project");
        assert_eq!(relative_str(root, Path::new("/project/src/a.py")).as_deref(), Some("src/a.py"));
        assert_eq!(relative_str(root, Path::new("/elsewhere/a.py")), None);
    }
}
