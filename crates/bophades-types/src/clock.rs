//! Shared block clock
//!
//! Every module reads `block.timestamp` from one `Clock` so that snapshots,
//! expiries and staleness checks agree with each other.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Monotonic block timestamp in seconds
#[derive(Debug, Default)]
pub struct Clock {
    now: AtomicU64,
}

impl Clock {
    /// Start the clock at an explicit timestamp
    pub fn at(timestamp: u64) -> Self {
        Self {
            now: AtomicU64::new(timestamp),
        }
    }

    /// Start the clock at the current wall-clock time
    pub fn system() -> Self {
        Self::at(Utc::now().timestamp().max(0) as u64)
    }

    pub fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    /// Move forward by `seconds`
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jump to `timestamp`; ignored if it would move time backwards
    pub fn warp(&self, timestamp: u64) {
        self.now.fetch_max(timestamp, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_moves_forward_only() {
        let clock = Clock::at(100);
        clock.advance(5);
        assert_eq!(clock.now(), 105);
        clock.warp(50);
        assert_eq!(clock.now(), 105);
        clock.warp(200);
        assert_eq!(clock.now(), 200);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01
        assert!(Clock::system().now() > 1_577_836_800);
    }
}
