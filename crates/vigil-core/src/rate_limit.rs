//! Sliding-window rate limiter for outbound REST calls.
//!
//! Each endpoint identity keeps the timestamps of its admitted calls. On every
//! check, timestamps older than the window are pruned and the call is admitted
//! iff fewer than `max_calls` remain.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::RateLimitConfig;

pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<AHashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self { max_calls: max_calls.max(1), window, calls: Mutex::new(AHashMap::new()) }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.max_calls, cfg.window())
    }

    /// Admit a call to `endpoint` at `now` if the window has room.
    ///
    /// On success the call is recorded. On refusal, returns how long until the
    /// oldest recorded call leaves the window.
    pub fn check_at(&self, endpoint: &str, now: Instant) -> Result<(), Duration> {
        let mut map = self.calls.lock();
        let calls = map.entry(endpoint.to_owned()).or_default();

        while let Some(&front) = calls.front() {
            if now.saturating_duration_since(front) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() < self.max_calls {
            calls.push_back(now);
            Ok(())
        } else {
            let oldest = calls.front().copied().unwrap_or(now);
            Err(self.window.saturating_sub(now.saturating_duration_since(oldest)))
        }
    }

    /// Non-blocking admission check at the current time.
    pub fn try_acquire(&self, endpoint: &str) -> bool {
        self.check_at(endpoint, Instant::now()).is_ok()
    }

    /// Wait until a call to `endpoint` is admitted.
    pub async fn acquire(&self, endpoint: &str) {
        loop {
            match self.check_at(endpoint, Instant::now()) {
                Ok(()) => return,
                Err(wait) => {
                    debug!("[rate-limit] {endpoint} saturated, waiting {wait:?}");
                    tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
                }
            }
        }
    }
}
