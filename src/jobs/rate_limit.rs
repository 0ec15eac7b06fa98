//! Submission admission state
//!
//! One explicitly owned object holds the global running-job count and the
//! per-caller rolling submission windows, guarded by a single lock at the
//! manager. Nothing here is ambient global state.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use super::types::SubmitError;

/// Per-caller rolling-window submission limiter
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: HashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `caller` has exhausted its window as of `now`.
    /// Does not record anything.
    pub fn is_exhausted(&mut self, caller: &str, now: Instant, max: usize, window: Duration) -> bool {
        let entries = self.windows.entry(caller.to_string()).or_default();
        while let Some(front) = entries.front() {
            if now.duration_since(*front) >= window {
                entries.pop_front();
            } else {
                break;
            }
        }
        entries.len() >= max
    }

    /// Record one admitted submission for `caller`
    pub fn record(&mut self, caller: &str, now: Instant) {
        self.windows.entry(caller.to_string()).or_default().push_back(now);
    }

    /// Remove the most recent recorded submission for `caller`
    pub fn refund(&mut self, caller: &str) {
        if let Some(entries) = self.windows.get_mut(caller) {
            entries.pop_back();
        }
    }
}

/// Shared admission state: running count + rate windows
#[derive(Debug)]
pub struct AdmissionState {
    running: usize,
    rate: RateLimiter,
    ceiling: usize,
    rate_max: usize,
    rate_window: Duration,
}

impl AdmissionState {
    pub fn new(ceiling: usize, rate_max: usize, rate_window: Duration) -> Self {
        Self {
            running: 0,
            rate: RateLimiter::new(),
            ceiling,
            rate_max,
            rate_window,
        }
    }

    /// Count of currently running jobs
    pub fn running(&self) -> usize {
        self.running
    }

    /// Try to admit a submission from `caller` at `now`.
    ///
    /// Rate limiting is checked before capacity so the two rejections stay
    /// distinct; a rejected submission never consumes window quota. On
    /// success the running count and the caller's window are both charged.
    pub fn try_admit(&mut self, caller: &str, now: Instant) -> Result<(), SubmitError> {
        if self
            .rate
            .is_exhausted(caller, now, self.rate_max, self.rate_window)
        {
            return Err(SubmitError::RateLimited {
                max: self.rate_max,
                window_secs: self.rate_window.as_secs(),
            });
        }
        if self.running >= self.ceiling {
            return Err(SubmitError::CapacityExceeded {
                running: self.running,
                ceiling: self.ceiling,
            });
        }
        self.rate.record(caller, now);
        self.running += 1;
        Ok(())
    }

    /// Release one running slot when a job reaches a terminal state
    pub fn release(&mut self) {
        self.running = self.running.saturating_sub(1);
    }

    /// Undo an admission that never became a running job: the slot comes
    /// back and the caller's window entry is refunded, so a submission
    /// rejected after admission burns no quota.
    pub fn rollback(&mut self, caller: &str) {
        self.running = self.running.saturating_sub(1);
        self.rate.refund(caller);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ceiling: usize, rate_max: usize, window_secs: u64) -> AdmissionState {
        AdmissionState::new(ceiling, rate_max, Duration::from_secs(window_secs))
    }

    #[test]
    fn test_admits_below_ceiling() {
        let mut s = state(2, 10, 60);
        let now = Instant::now();
        assert!(s.try_admit("alice", now).is_ok());
        assert!(s.try_admit("alice", now).is_ok());
        assert_eq!(s.running(), 2);
    }

    #[test]
    fn test_rejects_at_ceiling_with_capacity_error() {
        let mut s = state(2, 10, 60);
        let now = Instant::now();
        s.try_admit("alice", now).unwrap();
        s.try_admit("bob", now).unwrap();
        let err = s.try_admit("carol", now).unwrap_err();
        assert!(matches!(err, SubmitError::CapacityExceeded { running: 2, ceiling: 2 }));
    }

    #[test]
    fn test_release_frees_slot() {
        let mut s = state(1, 10, 60);
        let now = Instant::now();
        s.try_admit("alice", now).unwrap();
        assert!(s.try_admit("alice", now).is_err());
        s.release();
        assert!(s.try_admit("alice", now).is_ok());
    }

    #[test]
    fn test_rate_limit_per_caller() {
        let mut s = state(100, 2, 60);
        let now = Instant::now();
        s.try_admit("alice", now).unwrap();
        s.try_admit("alice", now).unwrap();
        let err = s.try_admit("alice", now).unwrap_err();
        assert!(matches!(err, SubmitError::RateLimited { max: 2, .. }));
        // Another caller is unaffected
        assert!(s.try_admit("bob", now).is_ok());
    }

    #[test]
    fn test_rate_window_rolls() {
        let mut s = state(100, 1, 10);
        let start = Instant::now();
        s.try_admit("alice", start).unwrap();
        assert!(s.try_admit("alice", start + Duration::from_secs(5)).is_err());
        assert!(s
            .try_admit("alice", start + Duration::from_secs(10))
            .is_ok());
    }

    #[test]
    fn test_rollback_refunds_slot_and_quota() {
        let mut s = state(10, 1, 3600);
        let now = Instant::now();
        s.try_admit("alice", now).unwrap();
        s.rollback("alice");
        assert_eq!(s.running(), 0);
        // The window entry was refunded too
        assert!(s.try_admit("alice", now).is_ok());
    }

    #[test]
    fn test_rejected_submission_consumes_no_quota() {
        // Filled capacity; capacity rejections must not charge the window
        let mut s = state(1, 1, 60);
        let now = Instant::now();
        s.try_admit("alice", now).unwrap();
        let err = s.try_admit("bob", now).unwrap_err();
        assert!(matches!(err, SubmitError::CapacityExceeded { .. }));
        s.release();
        // bob still has his full window
        assert!(s.try_admit("bob", now).is_ok());
    }
}
