//! Busy guard for in-flight seek/load operations.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Transient guard that suppresses telemetry reconciliation while a seek or
/// load is in flight.
///
/// The guard is time-based rather than scope-based: operations hold it for a
/// short window that outlives the operation itself, because renderers keep
/// reporting the pre-seek position for a moment after the command completes.
#[derive(Debug, Default)]
pub struct BusyGuard {
    held_until: Mutex<Option<Instant>>,
}

impl BusyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the guard for `duration` from now. An existing longer hold is
    /// never shortened.
    pub fn hold_for(&self, duration: Duration) {
        let until = Instant::now() + duration;
        let mut held = self.held_until.lock();
        if held.map_or(true, |current| until > current) {
            *held = Some(until);
        }
    }

    /// Drop the hold immediately.
    pub fn release(&self) {
        *self.held_until.lock() = None;
    }

    /// Returns `true` while the hold window is open.
    pub fn is_active(&self) -> bool {
        let mut held = self.held_until.lock();
        match *held {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                *held = None;
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_starts_inactive() {
        let guard = BusyGuard::new();
        assert!(!guard.is_active());
    }

    #[test]
    fn hold_then_release() {
        let guard = BusyGuard::new();
        guard.hold_for(Duration::from_secs(60));
        assert!(guard.is_active());
        guard.release();
        assert!(!guard.is_active());
    }

    #[test]
    fn expired_hold_deactivates() {
        let guard = BusyGuard::new();
        guard.hold_for(Duration::ZERO);
        assert!(!guard.is_active());
    }

    #[test]
    fn shorter_hold_does_not_shorten_existing() {
        let guard = BusyGuard::new();
        guard.hold_for(Duration::from_secs(60));
        guard.hold_for(Duration::ZERO);
        assert!(guard.is_active());
    }
}
