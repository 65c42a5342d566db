//! Retry policy for transient write failures.
//!
//! Baseline is a fixed interval with optional jitter; the exact curve is a
//! tunable, not a correctness requirement. Conflicts are never retried.

use rand::Rng;
use std::time::Duration;

/// How many times to attempt a write, and how long to wait in between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts before rolling back (the first try counts).
    pub max_retries: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
    /// Spread waits by ±25% so parallel failures don't resubmit in lockstep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(1000),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration, jitter: bool) -> Self {
        Self {
            max_retries,
            backoff,
            jitter,
        }
    }

    /// Policy with no waits, for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, false)
    }

    /// The wait before the next attempt.
    pub fn delay(&self) -> Duration {
        if !self.jitter || self.backoff.is_zero() {
            return self.backoff;
        }
        let millis = self.backoff.as_millis() as u64;
        let spread = millis / 4;
        let jittered = millis - spread + rand::thread_rng().gen_range(0..=2 * spread);
        Duration::from_millis(jittered)
    }
}
