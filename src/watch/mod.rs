// src/watch/mod.rs

//! Continuous mode.
//!
//! - [`watcher`] feeds filesystem events into an [`ActivityClock`].
//! - [`patterns`] decides which paths are ignored.
//! - [`hash`] fingerprints the config file for reload detection.
//! - [`controller`] debounces activity and cancels/restarts engine runs.

pub mod activity;
pub mod controller;
pub mod hash;
pub mod patterns;
pub mod watcher;

pub use activity::ActivityClock;
pub use controller::{DEBOUNCE, POLL, WatchController, WatchState};
pub use patterns::IgnoreRules;
pub use watcher::{WatcherHandle, spawn_watcher};
