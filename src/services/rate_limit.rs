//! Fixed-window request counting per client key.
//!
//! The store is injected behind [`RateLimitStore`] so a shared backend can
//! replace the in-memory default without touching the middleware. The
//! in-memory store is per process: several instances each enforce the limit
//! on their own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::RateLimitSettings;

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` at `now`.
    async fn hit(&self, key: &str, now: Instant) -> RateLimitDecision;

    /// Drop windows that have expired by `now`; returns how many were dropped.
    async fn sweep(&self, now: Instant) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Default store: a map of windows keyed by client.
#[derive(Debug)]
pub struct InMemoryRateLimitStore {
    max_requests: u32,
    window: Duration,
    windows: RwLock<HashMap<String, Window>>,
}

impl InMemoryRateLimitStore {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_requests, Duration::from_secs(settings.window_secs))
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut windows = self.windows.write().await;
        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                count: 0,
                started: now,
            };
        }

        if entry.count >= self.max_requests {
            let elapsed = now.duration_since(entry.started);
            let retry_after_secs = self.window.saturating_sub(elapsed).as_secs().max(1);
            return RateLimitDecision::Limited { retry_after_secs };
        }

        entry.count += 1;
        RateLimitDecision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    async fn sweep(&self, now: Instant) -> usize {
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.started) < self.window);
        before - windows.len()
    }
}

/// Periodically sweep expired windows.
pub fn start_sweeper(store: Arc<dyn RateLimitStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let dropped = store.sweep(Instant::now()).await;
            if dropped > 0 {
                debug!(target: "rate_limit", dropped, "Swept expired rate limit windows");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limits_after_max_requests() {
        let store = InMemoryRateLimitStore::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(
            store.hit("1.2.3.4", now).await,
            RateLimitDecision::Allowed { remaining: 1 }
        );
        assert_eq!(
            store.hit("1.2.3.4", now).await,
            RateLimitDecision::Allowed { remaining: 0 }
        );
        match store.hit("1.2.3.4", now + Duration::from_secs(10)).await {
            RateLimitDecision::Limited { retry_after_secs } => assert_eq!(retry_after_secs, 50),
            other => panic!("expected limit, got {:?}", other),
        }

        // Other clients are counted separately.
        assert!(matches!(
            store.hit("5.6.7.8", now).await,
            RateLimitDecision::Allowed { .. }
        ));
    }

    #[tokio::test]
    async fn test_window_resets() {
        let store = InMemoryRateLimitStore::new(1, Duration::from_secs(60));
        let now = Instant::now();
        store.hit("k", now).await;
        assert!(matches!(store.hit("k", now).await, RateLimitDecision::Limited { .. }));
        assert!(matches!(
            store.hit("k", now + Duration::from_secs(60)).await,
            RateLimitDecision::Allowed { .. }
        ));
    }

    #[tokio::test]
    async fn test_sweep_drops_expired_windows() {
        let store = InMemoryRateLimitStore::new(5, Duration::from_secs(60));
        let now = Instant::now();
        store.hit("old", now).await;
        store.hit("new", now + Duration::from_secs(30)).await;

        assert_eq!(store.sweep(now + Duration::from_secs(61)).await, 1);
        assert_eq!(store.sweep(now + Duration::from_secs(61)).await, 0);
    }
}
