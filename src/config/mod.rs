// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the `pyproject.toml`-backed data model (`model.rs`).
//! - Locate the project root and load the file (`loader.rs`).
//! - Validate job references and the requirement graph (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{PYPROJECT, load_config, parse_config, project_root};
pub use model::{Config, Job};
pub use validate::validate_config;
