//! Sliding-window rate limiting per subject.
//!
//! Each subject (usually a chat user id) keeps a log of the timestamps of its
//! admitted requests. A request is admitted while fewer than `max_requests`
//! of those timestamps fall inside the trailing window.
//!
//! Denied attempts are not logged, so hammering a limiter while throttled
//! does not push the recovery point further out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::clock::{secs_to_ms, Clock};
use crate::error::{Error, Result};

// == Rate Limiter ==
/// Per-subject sliding-window-log rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    // Admitted request timestamps per subject, oldest first
    requests: Mutex<HashMap<String, VecDeque<u64>>>,
    max_requests: usize,
    window_ms: u64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    // == Constructor ==
    /// Creates a limiter admitting `max_requests` per `window_secs` per subject.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if either parameter is zero or the
    /// window overflows in milliseconds.
    pub fn new(max_requests: usize, window_secs: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        if max_requests == 0 {
            return Err(Error::non_positive("max_requests"));
        }
        let window_ms = secs_to_ms("window_secs", window_secs)?;

        Ok(Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window_ms,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<u64>>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_window(&self, stamp: u64, now: u64) -> bool {
        now.saturating_sub(stamp) < self.window_ms
    }

    // == Is Allowed ==
    /// Admits or denies one request from `subject`.
    ///
    /// Prunes timestamps that left the window, then records `now` and returns
    /// `true` if there is room. A denial records nothing.
    pub fn is_allowed(&self, subject: &str) -> bool {
        let now = self.clock.now_ms();
        let mut requests = self.lock();
        let history = requests.entry(subject.to_string()).or_default();

        while history
            .front()
            .is_some_and(|&stamp| !self.in_window(stamp, now))
        {
            history.pop_front();
        }

        if history.len() >= self.max_requests {
            warn!(
                subject,
                requests = history.len(),
                max = self.max_requests,
                "Rate limit exceeded"
            );
            return false;
        }

        history.push_back(now);
        true
    }

    // == Remaining ==
    /// Requests `subject` may still make in the current window.
    ///
    /// Read-only: stale timestamps are skipped, not pruned.
    pub fn remaining(&self, subject: &str) -> usize {
        let now = self.clock.now_ms();
        let requests = self.lock();
        let live = requests
            .get(subject)
            .map(|history| {
                history
                    .iter()
                    .filter(|&&stamp| self.in_window(stamp, now))
                    .count()
            })
            .unwrap_or(0);

        self.max_requests.saturating_sub(live)
    }

    // == Reset ==
    /// Clears the history of one subject, or of every subject when `None`.
    pub fn reset(&self, subject: Option<&str>) {
        let mut requests = self.lock();
        match subject {
            Some(subject) => {
                requests.remove(subject);
                info!(subject, "Rate limit reset");
            }
            None => {
                requests.clear();
                info!("Rate limits reset for all subjects");
            }
        }
    }

    // == Purge Idle ==
    /// Drops subjects with no timestamps left in the window. Returns how many
    /// were dropped.
    pub fn purge_idle(&self) -> usize {
        let now = self.clock.now_ms();
        let mut requests = self.lock();
        let before = requests.len();
        requests.retain(|_, history| {
            history.retain(|&stamp| self.in_window(stamp, now));
            !history.is_empty()
        });
        before - requests.len()
    }

    // == Accessors ==
    /// Number of subjects with recorded history.
    pub fn tracked_subjects(&self) -> usize {
        self.lock().len()
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window_secs(&self) -> u64 {
        self.window_ms / 1000
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(max: usize, window: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::new(max, window, clock.clone()).unwrap();
        (limiter, clock)
    }

    #[test]
    fn test_rejects_zero_parameters() {
        let clock = Arc::new(ManualClock::new(0));
        assert!(matches!(
            RateLimiter::new(0, 60, clock.clone()),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            RateLimiter::new(3, 0, clock),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_overflowing_window() {
        let clock = Arc::new(ManualClock::new(0));
        assert!(matches!(
            RateLimiter::new(1, u64::MAX, clock),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_three_per_minute_scenario() {
        let (limiter, _) = limiter(3, 60);

        assert!(limiter.is_allowed("u1"));
        assert!(limiter.is_allowed("u1"));
        assert!(limiter.is_allowed("u1"));
        assert!(!limiter.is_allowed("u1"));
        assert_eq!(limiter.remaining("u1"), 0);
    }

    #[test]
    fn test_recovers_after_window() {
        let (limiter, clock) = limiter(2, 60);

        assert!(limiter.is_allowed("u1"));
        clock.advance_secs(30);
        assert!(limiter.is_allowed("u1"));
        assert!(!limiter.is_allowed("u1"));

        // First request leaves the window exactly at 60s
        clock.advance_secs(30);
        assert_eq!(limiter.remaining("u1"), 1);
        assert!(limiter.is_allowed("u1"));
        assert!(!limiter.is_allowed("u1"));
    }

    #[test]
    fn test_denial_consumes_nothing() {
        let (limiter, clock) = limiter(2, 10);

        assert!(limiter.is_allowed("u1"));
        assert!(limiter.is_allowed("u1"));
        for _ in 0..5 {
            clock.advance_ms(100);
            assert!(!limiter.is_allowed("u1"));
            assert_eq!(limiter.remaining("u1"), 0);
        }

        // Recovery is measured from the admitted requests only
        clock.set_ms(10_000);
        assert!(limiter.is_allowed("u1"));
    }

    #[test]
    fn test_remaining_is_read_only() {
        let (limiter, _) = limiter(5, 60);

        assert_eq!(limiter.remaining("u1"), 5);
        assert_eq!(limiter.remaining("u1"), 5);
        assert_eq!(limiter.tracked_subjects(), 0);

        limiter.is_allowed("u1");
        assert_eq!(limiter.remaining("u1"), 4);
        assert_eq!(limiter.remaining("u1"), 4);
    }

    #[test]
    fn test_subjects_are_independent() {
        let (limiter, _) = limiter(1, 60);

        assert!(limiter.is_allowed("u1"));
        assert!(!limiter.is_allowed("u1"));
        assert!(limiter.is_allowed("u2"));
    }

    #[test]
    fn test_reset_one_and_all() {
        let (limiter, _) = limiter(1, 60);

        limiter.is_allowed("u1");
        limiter.is_allowed("u2");

        limiter.reset(Some("u1"));
        assert!(limiter.is_allowed("u1"));
        assert!(!limiter.is_allowed("u2"));

        limiter.reset(None);
        assert_eq!(limiter.tracked_subjects(), 0);
        assert!(limiter.is_allowed("u2"));
    }

    #[test]
    fn test_purge_idle_subjects() {
        let (limiter, clock) = limiter(3, 10);

        limiter.is_allowed("idle");
        clock.advance_secs(5);
        limiter.is_allowed("active");
        clock.advance_secs(6);

        assert_eq!(limiter.purge_idle(), 1);
        assert_eq!(limiter.tracked_subjects(), 1);
        assert_eq!(limiter.remaining("active"), 2);
    }
}
