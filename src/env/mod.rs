// src/env/mod.rs

//! Runtime environments.
//!
//! - [`context`]: the per-version [`Context`] value and its paths.
//! - [`probe`]: interpreter lookup and version probing.
//! - [`resolver`]: one context per requested runtime.
//! - [`marker`]: staleness tracking for built environments.
//! - [`provision`]: building environments and reporting progress.

pub mod context;
pub mod marker;
pub mod probe;
pub mod provision;
pub mod resolver;

pub use context::{Context, STATE_DIR, venv_path};
pub use probe::{RuntimeCache, RuntimeProbe, SystemProbe};
pub use provision::{Provisioner, RealProvisioner};
pub use resolver::{resolve_contexts, select_builder};
