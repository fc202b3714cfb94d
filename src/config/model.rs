// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::types::Builder;
use crate::version::Version;

/// A named list of command templates plus its scheduling flags.
///
/// Names and requirement names are case-folded on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    pub name: String,
    /// Command templates, run in order (or concurrently if `parallel`).
    pub run: Vec<String>,
    /// Jobs that must run before this one.
    pub requires: Vec<String>,
    /// Run on the first context only.
    pub once: bool,
    /// Run this job's commands concurrently within one context.
    pub parallel: bool,
    /// Always show captured output, not only on failure.
    pub show_output: bool,
}

impl Job {
    pub fn new(name: impl AsRef<str>, run: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            run: run.into_iter().map(Into::into).collect(),
            requires: Vec::new(),
            once: false,
            parallel: false,
            show_output: false,
        }
    }
}

/// Validated project configuration.
///
/// Mirrors the `[tool.multirun]` table of `pyproject.toml`:
///
/// ```toml
/// [tool.multirun]
/// default = ["test", "lint"]
/// python_versions = ["3.10", "3.12"]
/// module = "frobnicate"
///
/// [tool.multirun.jobs]
/// lint = ["flake8 {module}", "black --check {module}"]
/// test = { run = "python -m pytest", requires = "lint", parallel = true }
/// ```
///
/// Unknown keys in the table become template values (`{module}` above).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub root: PathBuf,
    pub jobs: BTreeMap<String, Arc<Job>>,
    pub default: Vec<String>,
    pub values: BTreeMap<String, String>,
    /// Requested runtime versions, newest first, without duplicates.
    pub versions: Vec<Version>,
    /// Requirement files, relative to `root`. Empty means auto-discover.
    pub requirements: Vec<String>,
    /// Extras installed along with the project (`pip install -e .[extras]`).
    pub extras: Vec<String>,
    /// Paths observed in watch mode. Empty means the whole project.
    pub watch_paths: Vec<PathBuf>,
    pub builder: Builder,
}

impl Config {
    /// An empty configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            jobs: BTreeMap::new(),
            default: Vec::new(),
            values: BTreeMap::new(),
            versions: Vec::new(),
            requirements: Vec::new(),
            extras: Vec::new(),
            watch_paths: Vec::new(),
            builder: Builder::default(),
        }
    }

    pub fn job(&self, name: &str) -> Option<&Arc<Job>> {
        self.jobs.get(&name.to_lowercase())
    }

    pub fn pyproject_path(&self) -> PathBuf {
        self.root.join(super::loader::PYPROJECT)
    }

    /// Watch roots; defaults to the project root.
    pub fn effective_watch_paths(&self) -> Vec<PathBuf> {
        if self.watch_paths.is_empty() {
            vec![self.root.clone()]
        } else {
            self.watch_paths.clone()
        }
    }
}

/// Top level of `pyproject.toml`; only `[tool.multirun]` is of interest.
#[derive(Debug, Default, Deserialize)]
pub struct RawPyproject {
    #[serde(default)]
    pub tool: RawTool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawTool {
    #[serde(default)]
    pub multirun: Option<RawConfig>,
}

/// `[tool.multirun]` as written, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub jobs: BTreeMap<String, RawJob>,

    #[serde(default)]
    pub default: StringOrList,

    #[serde(default)]
    pub python_versions: StringOrList,

    #[serde(default)]
    pub requirements: StringOrList,

    #[serde(default)]
    pub extras: StringOrList,

    #[serde(default)]
    pub watch_paths: StringOrList,

    #[serde(default)]
    pub builder: Builder,

    /// Everything else: template values.
    #[serde(flatten)]
    pub values: BTreeMap<String, toml::Value>,
}

/// A job may be a single command, a list of commands, or a full table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawJob {
    Command(String),
    Commands(Vec<String>),
    Table(RawJobTable),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawJobTable {
    #[serde(default)]
    pub run: StringOrList,
    #[serde(default)]
    pub requires: StringOrList,
    #[serde(default)]
    pub once: bool,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub show_output: bool,
}

/// `"x"` and `["x", "y"]` are both accepted wherever a list is expected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl Default for StringOrList {
    fn default() -> Self {
        StringOrList::Many(Vec::new())
    }
}

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}
