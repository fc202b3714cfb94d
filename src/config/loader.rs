// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{Config, RawPyproject};
use crate::errors::Result;

/// Project metadata file that also carries the `[tool.multirun]` table.
pub const PYPROJECT: &str = "pyproject.toml";

/// Directory markers that identify a project root.
const ROOT_MARKERS: &[&str] = &[PYPROJECT, ".git", ".hg"];

/// Walk upward from `start` until a directory containing a root marker is
/// found. Falls back to `start` itself.
pub fn project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .unwrap_or(start)
        .to_path_buf()
}

/// Parse the contents of a `pyproject.toml` rooted at `root`.
///
/// Documents without a `[tool.multirun]` table produce an empty config.
pub fn parse_config(contents: &str, root: &Path) -> Result<Config> {
    let raw: RawPyproject = toml::from_str(contents)?;
    match raw.tool.multirun {
        Some(table) => Config::from_raw(table, root),
        None => Ok(Config::new(root)),
    }
}

/// Locate and load the project configuration.
///
/// `start` may be a directory inside the project or the `pyproject.toml`
/// itself; it defaults to the current directory. When no `pyproject.toml`
/// exists at the project root, an empty config rooted at `start` is
/// returned.
pub fn load_config(start: Option<&Path>) -> Result<Config> {
    let start = match start {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let start = fs::canonicalize(&start)?;
    let start = if start.is_file() {
        start.parent().map(Path::to_path_buf).unwrap_or(start)
    } else {
        start
    };

    let root = project_root(&start);
    let pyproject = root.join(PYPROJECT);
    if !pyproject.is_file() {
        debug!(root = %start.display(), "no pyproject.toml found, using empty config");
        return Ok(Config::new(start));
    }

    debug!(path = %pyproject.display(), "loading config");
    let contents = fs::read_to_string(&pyproject)?;
    parse_config(&contents, &root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_without_table_is_empty() {
        let config = parse_config("[tool.black]\nline_length = 37\n", Path::new("/p")).unwrap();
        assert_eq!(config, Config::new("/p"));
    }

    #[test]
    fn parse_config_reads_everything() {
        let contents = r#"
            [tool.multirun]
            default = "test"
            module = "frob"
            retries = 3
            python_versions = ["3.9", "3.12"]
            requirements = "requirements-dev.txt"
            extras = ["dev"]
            watch_paths = ["src"]
            builder = "pip"

            [tool.multirun.jobs]
            lint = "flake8 {module}"
            Test = { run = ["pytest", "mypy {module}"], requires = ["LINT"], parallel = true, show_output = true }
            publish = { run = "twine upload", once = true }
        "#;
        let config = parse_config(contents, Path::new("/p")).unwrap();

        assert_eq!(config.default, vec!["test"]);
        assert_eq!(config.values["module"], "frob");
        assert_eq!(config.values["retries"], "3");
        assert_eq!(config.versions[0].to_string(), "3.12");
        assert_eq!(config.requirements, vec!["requirements-dev.txt"]);
        assert_eq!(config.extras, vec!["dev"]);
        assert_eq!(config.watch_paths, vec![PathBuf::from("/p/src")]);
        assert_eq!(config.builder, crate::types::Builder::Pip);

        let test = &config.jobs["test"];
        assert_eq!(test.requires, vec!["lint"]);
        assert!(test.parallel && test.show_output && !test.once);
        assert!(config.jobs["publish"].once);
    }

    #[test]
    fn unknown_job_keys_are_rejected() {
        let contents = r#"
            [tool.multirun.jobs]
            lint = { run = "flake8", paralel = true }
        "#;
        assert!(parse_config(contents, Path::new("/p")).is_err());
    }

    #[test]
    fn undefined_default_is_config_error() {
        let contents = r#"
            [tool.multirun]
            default = ["missing"]
        "#;
        let err = parse_config(contents, Path::new("/p")).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("missing"));
    }
}
