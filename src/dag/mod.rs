// src/dag/mod.rs

//! Job dependency resolution.
//!
//! - [`resolve`] expands requested job names into an ordered queue with
//!   requirements first.

pub mod resolve;

pub use resolve::resolve_jobs;
