//! Health check endpoints.

use std::time::{Duration, Instant};

use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::config::Config;
use crate::db::DbPool;

const DB_PING_TIMEOUT: Duration = Duration::from_secs(2);
/// Round-trips slower than this mark the service as degraded.
const DB_SLOW_THRESHOLD: Duration = Duration::from_secs(1);
const PAGE_SIZE_BYTES: u64 = 4096;

/// When the process started serving; registered as app data.
#[derive(Debug, Clone, Copy)]
pub struct StartedAt(pub Instant);

impl StartedAt {
    pub fn now() -> Self {
        Self(Instant::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: HealthStatus,
    timestamp: String,
    #[serde(rename = "uptimeSeconds")]
    uptime_seconds: u64,
}

#[derive(Serialize, ToSchema)]
pub struct DatabaseCheck {
    status: HealthStatus,
    #[serde(rename = "latencyMs", skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MemoryCheck {
    status: HealthStatus,
    #[serde(rename = "residentMb", skip_serializing_if = "Option::is_none")]
    resident_mb: Option<u64>,
    #[serde(rename = "thresholdMb")]
    threshold_mb: u64,
}

#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    status: HealthStatus,
    timestamp: String,
    database: DatabaseCheck,
    memory: MemoryCheck,
}

/// Liveness: answers as long as the process runs.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server is running", body = HealthResponse),
    )
)]
#[get("/health")]
pub async fn health(started: web::Data<StartedAt>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: HealthStatus::Healthy,
        timestamp: Utc::now().to_rfc3339(),
        uptime_seconds: started.0.elapsed().as_secs(),
    })
}

/// Readiness: database round-trip plus resident memory.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Server and database are ready", body = ReadyResponse),
        (status = 503, description = "Database unreachable", body = crate::error::ErrorResponse),
    )
)]
#[get("/health/ready")]
pub async fn ready(pool: web::Data<DbPool>, config: web::Data<Config>) -> HttpResponse {
    let database = match pool.ping(DB_PING_TIMEOUT).await {
        Ok(latency) => DatabaseCheck {
            status: if latency > DB_SLOW_THRESHOLD {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            },
            latency_ms: Some(latency.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "Readiness check: database unreachable");
            DatabaseCheck {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    };

    let resident_mb = resident_memory_mb();
    let memory = MemoryCheck {
        status: match resident_mb {
            Some(mb) if mb > config.memory_degraded_mb => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        },
        resident_mb,
        threshold_mb: config.memory_degraded_mb,
    };

    let status = overall_status(database.status, memory.status);
    let body = ReadyResponse {
        status,
        timestamp: Utc::now().to_rfc3339(),
        database,
        memory,
    };

    match status {
        HealthStatus::Unhealthy => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::Ok().json(body),
    }
}

fn overall_status(database: HealthStatus, memory: HealthStatus) -> HealthStatus {
    match (database, memory) {
        (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    }
}

/// Resident set size from `/proc/self/statm`; `None` off Linux.
fn resident_memory_mb() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    parse_statm_resident(&statm).map(|pages| pages * PAGE_SIZE_BYTES / (1024 * 1024))
}

fn parse_statm_resident(statm: &str) -> Option<u64> {
    statm.split_whitespace().nth(1)?.parse().ok()
}

/// Configure health routes.
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[test]
    fn test_parse_statm() {
        assert_eq!(parse_statm_resident("12345 2560 300 10 0 900 0\n"), Some(2560));
        assert_eq!(parse_statm_resident("12345"), None);
        assert_eq!(parse_statm_resident(""), None);
    }

    #[test]
    fn test_overall_status() {
        use HealthStatus::*;
        assert_eq!(overall_status(Healthy, Healthy), Healthy);
        assert_eq!(overall_status(Healthy, Degraded), Degraded);
        assert_eq!(overall_status(Degraded, Healthy), Degraded);
        assert_eq!(overall_status(Unhealthy, Healthy), Unhealthy);
        assert_eq!(overall_status(Unhealthy, Degraded), Unhealthy);
    }

    #[actix_web::test]
    async fn test_liveness_reports_uptime() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(StartedAt::now()))
                .service(health),
        )
        .await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["uptimeSeconds"].is_u64());
    }
}
