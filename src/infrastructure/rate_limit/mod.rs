//! Rate limiter implementation
//!
//! Single-process sliding window admission control for outbound calls.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

use crate::domain::DomainError;

/// Slack added to a computed wait so the oldest call has left the window
const WAIT_EPSILON: Duration = Duration::from_millis(100);

/// Snapshot of the limiter state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Remaining calls in the current window
    pub remaining: u32,
    /// Total limit for the window
    pub limit: u32,
    /// Time until the oldest recorded call leaves the window
    pub reset_in: Duration,
}

/// Sliding window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    /// Call timestamps in the trailing window, oldest first
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a call if the window has room; never waits
    pub async fn allow(&self) -> bool {
        let now = Instant::now();
        let mut calls = self.calls.lock().await;
        self.prune(&mut calls, now);

        if calls.len() < self.max_calls as usize {
            calls.push_back(now);
            true
        } else {
            false
        }
    }

    /// Like `allow`, for callers that give up rather than queue
    pub async fn try_acquire(&self) -> Result<(), DomainError> {
        if self.allow().await {
            return Ok(());
        }

        Err(DomainError::rate_limited(format!(
            "{} calls per {}s used, next slot in {}s",
            self.max_calls,
            self.window.as_secs(),
            self.reset_in().await.as_secs()
        )))
    }

    /// Wait until the window has room, then record the call.
    ///
    /// The lock is released while sleeping; after waking the window is
    /// re-checked so concurrent waiters cannot overfill it.
    pub async fn wait_until_allowed(&self) {
        if self.max_calls == 0 {
            return;
        }

        loop {
            let wait = {
                let now = Instant::now();
                let mut calls = self.calls.lock().await;
                self.prune(&mut calls, now);

                if calls.len() < self.max_calls as usize {
                    calls.push_back(now);
                    return;
                }

                match calls.front() {
                    Some(oldest) => self.window.saturating_sub(now - *oldest) + WAIT_EPSILON,
                    None => WAIT_EPSILON,
                }
            };

            info!(
                wait_ms = wait.as_millis() as u64,
                max_calls = self.max_calls,
                "Rate limit reached, waiting for window to free up"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Calls still available in the current window
    pub async fn remaining(&self) -> u32 {
        let mut calls = self.calls.lock().await;
        self.prune(&mut calls, Instant::now());
        self.max_calls.saturating_sub(calls.len() as u32)
    }

    /// Time until the oldest call exits the window; zero when empty
    pub async fn reset_in(&self) -> Duration {
        let now = Instant::now();
        let mut calls = self.calls.lock().await;
        self.prune(&mut calls, now);

        calls
            .front()
            .map(|oldest| self.window.saturating_sub(now - *oldest))
            .unwrap_or(Duration::ZERO)
    }

    pub async fn status(&self) -> RateLimitStatus {
        let now = Instant::now();
        let mut calls = self.calls.lock().await;
        self.prune(&mut calls, now);

        RateLimitStatus {
            remaining: self.max_calls.saturating_sub(calls.len() as u32),
            limit: self.max_calls,
            reset_in: calls
                .front()
                .map(|oldest| self.window.saturating_sub(now - *oldest))
                .unwrap_or(Duration::ZERO),
        }
    }

    /// Calls recorded within the trailing window ending at `now`
    #[cfg(test)]
    async fn recorded_in_window(&self) -> usize {
        let mut calls = self.calls.lock().await;
        self.prune(&mut calls, Instant::now());
        calls.len()
    }

    fn prune(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) < self.window {
                break;
            }
            calls.pop_front();
        }
    }
}
