//! Client-side scan rate limiting.
//!
//! A sliding window per user: a scan is admitted when fewer than
//! `max_requests` scans for the same user started within the last
//! `window_seconds`. Rejected scans fail with [`ScanError::RateLimited`] and
//! go through the same fail-closed handling as any other scan failure.
//!
//! Users whose window has drained are dropped by [`RateLimiter::sweep`],
//! which the orchestrator runs on the cache sweep period.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};
use warden_verdict::Verdict;

use crate::config::RateLimitConfig;
use crate::scanner::{ScanError, ScanRequest, Scanner};

/// Per-user sliding window counter.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    history: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_requests` per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a limiter from configuration.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prune(starts: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while starts
            .front()
            .is_some_and(|start| now.duration_since(*start) >= window)
        {
            starts.pop_front();
        }
    }

    /// Records a request for `user` if the window has room.
    pub fn try_acquire(&self, user: &str) -> Result<(), ScanError> {
        let now = Instant::now();
        let mut history = self.lock();
        let starts = history.entry(user.to_string()).or_default();
        Self::prune(starts, now, self.window);

        if starts.len() >= self.max_requests as usize {
            if starts.is_empty() {
                history.remove(user);
            }
            return Err(ScanError::RateLimited {
                limit: self.max_requests,
                window_seconds: self.window.as_secs(),
            });
        }
        starts.push_back(now);
        Ok(())
    }

    /// Drops expired request times and forgets users with none left.
    /// Returns how many users were forgotten.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut history = self.lock();
        let before = history.len();
        history.retain(|_, starts| {
            Self::prune(starts, now, self.window);
            !starts.is_empty()
        });
        let forgotten = before - history.len();
        if forgotten > 0 {
            debug!(forgotten, tracked = history.len(), "Swept idle rate limit windows");
        }
        forgotten
    }

    /// Number of users with a window in memory.
    pub fn tracked_users(&self) -> usize {
        self.lock().len()
    }

    /// Requests still available to `user` in the current window.
    pub fn remaining(&self, user: &str) -> u32 {
        let now = Instant::now();
        let history = self.lock();
        let used = history.get(user).map_or(0, |starts| {
            starts
                .iter()
                .filter(|start| now.duration_since(**start) < self.window)
                .count()
        });
        self.max_requests.saturating_sub(used as u32)
    }
}

/// Wraps a scanner with a [`RateLimiter`].
pub struct RateLimitedScanner<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S: Scanner> RateLimitedScanner<S> {
    /// Wraps `inner`. The limiter may be shared with a housekeeping task.
    pub fn new(inner: S, limiter: impl Into<Arc<RateLimiter>>) -> Self {
        Self {
            inner,
            limiter: limiter.into(),
        }
    }

    /// The limiter in front of the scanner.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

#[async_trait]
impl<S: Scanner> Scanner for RateLimitedScanner<S> {
    async fn scan(&self, request: ScanRequest) -> Result<Verdict, ScanError> {
        if let Err(err) = self.limiter.try_acquire(request.user_key()) {
            warn!(user = %request.user_key(), error = %err, "Scan rejected by rate limiter");
            return Err(err);
        }
        self.inner.scan(request).await
    }
}
