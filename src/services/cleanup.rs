//! Periodic removal of expired and revoked refresh tokens.

use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::db::DbPool;

/// Configuration for the cleanup task.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Revoked or expired tokens older than this are deleted
    pub grace_secs: u64,
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            grace_secs: 24 * 3600,
            interval_secs: 3600,
        }
    }
}

/// Start the cleanup background task.
pub fn start_cleanup_task(pool: DbPool, config: CleanupConfig) {
    tokio::spawn(async move {
        info!(
            "Starting token cleanup (grace: {} s, interval: {} s)",
            config.grace_secs, config.interval_secs
        );

        let mut ticker = interval(Duration::from_secs(config.interval_secs));
        loop {
            ticker.tick().await;
            match pool.cleanup_refresh_tokens(config.grace_secs).await {
                Ok(0) => {}
                Ok(deleted) => info!("Removed {} stale refresh tokens", deleted),
                Err(e) => error!("Refresh token cleanup failed: {}", e),
            }
        }
    });
}
