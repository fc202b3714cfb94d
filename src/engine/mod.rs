// src/engine/mod.rs

//! Execution engine.
//!
//! - [`event`] defines the [`Event`] stream every consumer observes.
//! - [`fanin`] merges concurrent producers by readiness.
//! - [`runner`] provisions contexts and runs the job queue across them.

pub mod event;
pub mod fanin;
pub mod runner;

pub use event::{Event, EventReceiver, EventSender};
pub use fanin::FanIn;
pub use runner::{Engine, EngineOptions, RunOutcome};
