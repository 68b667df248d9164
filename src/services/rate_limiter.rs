//! Failed-login throttling
//!
//! A username that failed to log in `MAX_FAILED_ATTEMPTS` times within
//! `WINDOW_MINUTES` is refused until the oldest failure ages out. The
//! state is in-process only and is pruned by `cleanup`, which `main`
//! runs every few minutes.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const MAX_FAILED_ATTEMPTS: usize = 5;
pub const WINDOW_MINUTES: i64 = 15;

/// Login rate limiter keyed by lowercased username
pub struct LoginRateLimiter {
    attempts: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
    max_attempts: usize,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::with_limits(MAX_FAILED_ATTEMPTS, Duration::minutes(WINDOW_MINUTES))
    }

    pub fn with_limits(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    fn key(username: &str) -> String {
        username.trim().to_lowercase()
    }

    /// Whether `username` has used up its failed attempts
    pub async fn is_limited(&self, username: &str) -> bool {
        let cutoff = Utc::now() - self.window;
        let attempts = self.attempts.read().await;

        attempts
            .get(&Self::key(username))
            .map(|times| times.iter().filter(|t| **t > cutoff).count() >= self.max_attempts)
            .unwrap_or(false)
    }

    pub async fn record_failed_attempt(&self, username: &str) {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;

        let times = attempts.entry(Self::key(username)).or_default();
        times.retain(|t| *t > cutoff);
        times.push(Utc::now());
    }

    /// Forget failures after a successful login
    pub async fn clear(&self, username: &str) {
        self.attempts.write().await.remove(&Self::key(username));
    }

    /// Drop attempts older than the window
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;

        attempts.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
    }

}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
