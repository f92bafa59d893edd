//! Business logic services.

pub mod activity;
pub mod cleanup;
pub mod github;
pub mod mailer;
pub mod outbox;
pub mod permissions;
pub mod rate_limit;
pub mod storage;

pub use cleanup::{start_cleanup_task, CleanupConfig};
pub use github::GitHubClient;
pub use mailer::Mailer;
pub use outbox::Outbox;
pub use rate_limit::{InMemoryRateLimitStore, RateLimitStore};
pub use storage::LocalStorage;
