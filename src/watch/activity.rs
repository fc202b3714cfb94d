// src/watch/activity.rs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Last-activity timestamp shared between the filesystem callback and the
/// watch loop.
///
/// Timestamps are microseconds since the clock was created. Writers only
/// ever move the value forward (`fetch_max`), so no lock is needed.
#[derive(Debug)]
pub struct ActivityClock {
    origin: Instant,
    /// 0 means "no activity yet".
    last: AtomicU64,
    config_changed: AtomicBool,
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: AtomicU64::new(0),
            config_changed: AtomicBool::new(false),
        }
    }

    /// Current timestamp; always at least 1.
    pub fn now(&self) -> u64 {
        let micros = self.origin.elapsed().as_micros();
        u64::try_from(micros).unwrap_or(u64::MAX).max(1)
    }

    /// Record activity at the current time.
    pub fn touch(&self) {
        self.last.fetch_max(self.now(), Ordering::SeqCst);
    }

    pub fn last_activity(&self) -> Option<u64> {
        match self.last.load(Ordering::SeqCst) {
            0 => None,
            t => Some(t),
        }
    }

    /// Whether anything happened after `since`.
    pub fn activity_since(&self, since: u64) -> bool {
        self.last.load(Ordering::SeqCst) > since
    }

    /// Whether the latest activity is at least `interval` old.
    pub fn quiet_for(&self, interval: Duration) -> bool {
        let last = self.last.load(Ordering::SeqCst);
        let elapsed = Duration::from_micros(self.now().saturating_sub(last));
        elapsed >= interval
    }

    /// The config file changed; also counts as activity.
    pub fn mark_config_changed(&self) {
        self.config_changed.store(true, Ordering::SeqCst);
        self.touch();
    }

    /// Consume the config-changed flag.
    pub fn take_config_changed(&self) -> bool {
        self.config_changed.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_moves_forward_only() {
        let clock = ActivityClock::new();
        assert_eq!(clock.last_activity(), None);

        let before = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        clock.touch();
        assert!(clock.activity_since(before));

        let after = clock.now();
        assert!(!clock.activity_since(after));
    }

    #[test]
    fn quiet_after_interval() {
        let clock = ActivityClock::new();
        clock.touch();
        assert!(!clock.quiet_for(Duration::from_secs(10)));
        std::thread::sleep(Duration::from_millis(20));
        assert!(clock.quiet_for(Duration::from_millis(10)));
    }

    #[test]
    fn config_flag_is_consumed() {
        let clock = ActivityClock::new();
        clock.mark_config_changed();
        assert!(clock.last_activity().is_some());
        assert!(clock.take_config_changed());
        assert!(!clock.take_config_changed());
    }
}
