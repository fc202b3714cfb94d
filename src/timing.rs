// src/timing.rs

//! Operation timings for `--benchmark`.

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One completed, timed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub label: String,
    /// Offset from the recorder's creation.
    pub start: Duration,
    pub duration: Duration,
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ms", self.label, self.duration.as_millis())
    }
}

/// Append-only timing recorder, safe to share between tasks.
#[derive(Debug)]
pub struct Timings {
    origin: Instant,
    entries: Mutex<Vec<Timing>>,
}

impl Default for Timings {
    fn default() -> Self {
        Self::new()
    }
}

impl Timings {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Start timing `label`; the entry is recorded when the guard drops.
    pub fn start(&self, label: impl Into<String>) -> Timer<'_> {
        Timer {
            timings: self,
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn record(&self, timing: Timing) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(timing);
    }

    /// Take all entries recorded so far, ordered by start.
    pub fn drain(&self) -> Vec<Timing> {
        let mut entries = std::mem::take(&mut *self.entries.lock().unwrap_or_else(|p| p.into_inner()));
        entries.sort_by_key(|t| t.start);
        entries
    }
}

/// Guard returned by [`Timings::start`].
#[must_use = "the timing is recorded when the guard is dropped"]
pub struct Timer<'a> {
    timings: &'a Timings,
    label: String,
    started: Instant,
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.timings.record(Timing {
            label: std::mem::take(&mut self.label),
            start: self.started.saturating_duration_since(self.timings.origin),
            duration: self.started.elapsed(),
        });
    }
}
