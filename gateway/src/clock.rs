//! Clock collaborator: the caller-observed current time.

use agora_types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for reading the current time.
///
/// Implementations must never go backwards: deadlines are compared against
/// this value and a rewind would reopen closed voting windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time, clamped so it never reports a value lower than one it
/// has already returned.
pub struct SystemClock {
    high_water: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            high_water: AtomicU64::new(0),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Timestamp::now().as_secs();
        let previous = self.high_water.fetch_max(wall, Ordering::SeqCst);
        Timestamp::new(previous.max(wall))
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn high_water_mark_masks_a_rewind() {
        let clock = SystemClock::new();
        clock.high_water.store(u64::MAX - 1, Ordering::SeqCst);
        assert_eq!(clock.now().as_secs(), u64::MAX - 1);
    }
}
