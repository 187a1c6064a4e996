//! Request pacing
//!
//! A token bucket (governor) placed in front of every API call. Pacing is
//! off unless operators configure a quota.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Window a pacing quota is measured over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingWindow {
    Second,
    Minute,
}

/// Request quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Requests allowed per window
    pub requests: u32,
    pub window: PacingWindow,
}

impl PacingConfig {
    /// `requests` per second
    pub fn per_second(requests: u32) -> Self {
        Self {
            requests,
            window: PacingWindow::Second,
        }
    }

    /// `requests` per minute
    pub fn per_minute(requests: u32) -> Self {
        Self {
            requests,
            window: PacingWindow::Minute,
        }
    }

    fn quota(self) -> Quota {
        // Zero is rejected by settings validation; treat it as one here
        let n = NonZeroU32::new(self.requests).unwrap_or(NonZeroU32::MIN);
        match self.window {
            PacingWindow::Second => Quota::per_second(n),
            PacingWindow::Minute => Quota::per_minute(n),
        }
    }
}

/// Shared pacer; clones draw from the same bucket
#[derive(Clone)]
pub struct Pacer {
    bucket: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    config: PacingConfig,
}

impl Pacer {
    /// Create a pacer for a quota
    pub fn new(config: PacingConfig) -> Self {
        Self {
            bucket: Arc::new(RateLimiter::direct(config.quota())),
            config,
        }
    }

    /// Quota this pacer enforces
    pub fn config(&self) -> PacingConfig {
        self.config
    }

    /// Wait for a slot
    pub async fn ready(&self) {
        self.bucket.until_ready().await;
    }

    /// Take a slot if one is free
    pub fn try_ready(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer").field("config", &self.config).finish()
    }
}
