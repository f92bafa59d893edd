//! Database module providing connection management, migrations, and queries.

pub mod activities;
pub mod attachments;
pub mod comments;
pub mod github;
pub mod issues;
pub mod members;
pub mod notifications;
pub mod projects;
pub mod refresh_tokens;
pub mod releases;
pub mod sprints;
pub mod stats;
pub mod tags;
pub mod tasks;
pub mod users;

use std::time::{Duration, Instant};

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::config::DatabaseSettings;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

/// Database connection pool wrapper.
///
/// `DatabaseConnection` is already a pooled, cheaply clonable handle.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect to PostgreSQL using the configured pool bounds.
    pub async fn new(settings: &DatabaseSettings) -> AppResult<Self> {
        let mut options = ConnectOptions::new(settings.url.clone());
        options
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(DbPool { conn })
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        DbPool { conn }
    }

    /// Get the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply all pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    /// Round-trip `SELECT 1`, returning its latency.
    pub async fn ping(&self, timeout: Duration) -> AppResult<Duration> {
        let started = Instant::now();
        let probe = self.conn.execute_unprepared("SELECT 1");

        match tokio::time::timeout(timeout, probe).await {
            Ok(Ok(_)) => Ok(started.elapsed()),
            Ok(Err(e)) => Err(AppError::Database(e.to_string())),
            Err(_) => Err(AppError::Database(format!(
                "Database ping timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }
}

/// `%term%` for ILIKE, with the term's own wildcards matched literally.
/// Backslash is PostgreSQL's default LIKE escape.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("login"), "%login%");
        assert_eq!(contains_pattern("100%"), r"%100\%%");
        assert_eq!(contains_pattern("user_id"), r"%user\_id%");
        assert_eq!(contains_pattern(r"C:\tmp"), r"%C:\\tmp%");
    }
}
