//! Clock Module
//!
//! Time source shared by every cache, limiter and memory instance.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

// == Clock Trait ==
/// Millisecond time source.
///
/// Components only compare timestamps produced by the same clock, so the
/// epoch is irrelevant as long as it never goes backwards.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time in milliseconds.
    fn now_ms(&self) -> u64;
}

// == System Clock ==
/// Wall clock backed by `SystemTime` (Unix milliseconds).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        current_timestamp_ms()
    }
}

// == Manual Clock ==
/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock starting at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Moves the clock forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Moves the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs.saturating_mul(1000));
    }

    /// Sets the absolute time.
    pub fn set_ms(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Converts a positive duration in seconds to milliseconds.
///
/// # Errors
/// Returns `Error::InvalidConfig` naming `field` if `secs` is zero or the
/// millisecond value does not fit in a `u64`.
pub(crate) fn secs_to_ms(field: &str, secs: u64) -> Result<u64> {
    if secs == 0 {
        return Err(Error::non_positive(field));
    }
    secs.checked_mul(1000).ok_or_else(|| Error::out_of_range(field))
}

/// Returns current Unix timestamp in milliseconds.
///
/// A system clock set before the epoch reads as 0 instead of panicking.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
