//! Bounded exponential backoff for feed reconnects.
//!
//! The delay before retry `n` (zero-based) is `base * 2^min(n, 4)`, i.e. it
//! doubles up to a cap of 16x the base. After `max_attempts` retries the
//! policy yields `None` and the caller gives up.

use std::time::Duration;

/// Highest exponent applied to the base delay (16x).
const MAX_EXPONENT: u32 = 4;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self { base, max_attempts, attempt: 0 }
    }

    /// Number of retries consumed since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for a given attempt number, without consuming it.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(2u32.pow(attempt.min(MAX_EXPONENT)))
    }

    /// Consume one retry and return its delay, or `None` when exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    /// Called once the connection is streaming again.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
