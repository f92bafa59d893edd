//! Tablero server - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use utoipa_swagger_ui::SwaggerUi;

use tablero_lib::api;
use tablero_lib::auth::JwtKeys;
use tablero_lib::config::Config;
use tablero_lib::db::DbPool;
use tablero_lib::error::set_expose_internal_errors;
use tablero_lib::middleware::{RateLimit, RequestLogger};
use tablero_lib::services::rate_limit::start_sweeper;
use tablero_lib::services::{
    start_cleanup_task, CleanupConfig, GitHubClient, InMemoryRateLimitStore, LocalStorage, Mailer,
    Outbox, RateLimitStore,
};

/// JSON bodies are small; uploads go through multipart and are capped while streaming.
const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, e);
    io::Error::other(format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| io::Error::other(format!("Failed to set tracing subscriber: {}", e)))?;

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL, TABLERO_JWT_SECRET and TABLERO_TOKEN_ENCRYPTION_KEY must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Tablero Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    let is_development = config.is_development();
    if is_development {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }
    set_expose_internal_errors(is_development);

    let pool = DbPool::new(&config.database)
        .await
        .map_err(|e| startup_error("Failed to initialize database", e))?;
    info!("Database connection established");

    pool.run_migrations()
        .await
        .map_err(|e| startup_error("Failed to run migrations", e))?;
    info!("Database migrations complete");

    let outbox = Outbox::start(pool.clone());
    let jwt_keys = JwtKeys::from_settings(&config.auth);
    let storage = LocalStorage::new(&config.uploads)
        .await
        .map_err(|e| startup_error("Failed to prepare upload directory", e))?;
    let github = GitHubClient::new(&config.github)
        .map_err(|e| startup_error("Failed to build GitHub client", e))?;
    let mailer = Mailer::from_config(&config)
        .map_err(|e| startup_error("Failed to configure mailer", e))?;

    let rate_limit_store: Arc<dyn RateLimitStore> =
        Arc::new(InMemoryRateLimitStore::from_settings(&config.rate_limit));
    start_sweeper(
        rate_limit_store.clone(),
        Duration::from_secs(config.rate_limit.window_secs.max(1)),
    );
    info!(
        "Rate limit: {} requests per {} s per client",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );

    start_cleanup_task(
        pool.clone(),
        CleanupConfig {
            interval_secs: if is_development { 600 } else { 3600 },
            ..CleanupConfig::default()
        },
    );

    if is_development {
        info!("API docs at http://{}/docs/", config.bind_address());
    }

    info!(
        "Upload limits: {}MB per file, {}MB per task",
        config.uploads.max_file_size / 1024 / 1024,
        config.uploads.max_task_total_size / 1024 / 1024
    );

    let bind_address = config.bind_address();
    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let started_at = api::StartedAt::now();
    let cors_origins = config.cors_origins.clone();
    let config_data = web::Data::new(config);
    let outbox_data = web::Data::new(outbox.clone());
    let pool_data = web::Data::new(pool);
    let jwt_data = web::Data::new(jwt_keys);
    let storage_data = web::Data::new(storage);
    let github_data = web::Data::new(github);
    let mailer_data = web::Data::new(mailer);

    let server = HttpServer::new(move || {
        let cors = if is_development {
            Cors::permissive()
        } else {
            cors_origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
                .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .allowed_headers(vec![
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::CONTENT_TYPE,
                ])
                .supports_credentials()
                .max_age(3600)
        };

        App::new()
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(outbox_data.clone())
            .app_data(jwt_data.clone())
            .app_data(storage_data.clone())
            .app_data(github_data.clone())
            .app_data(mailer_data.clone())
            .app_data(web::Data::new(started_at))
            .app_data(web::JsonConfig::default().limit(JSON_BODY_LIMIT))
            .configure(api::configure_health_routes)
            .configure(|cfg| {
                if is_development {
                    cfg.service(
                        SwaggerUi::new("/docs/{_:.*}")
                            .config(utoipa_swagger_ui::Config::from("/api/openapi.json")),
                    );
                }
            })
            .service(
                web::scope("/api")
                    .wrap(RateLimit::new(rate_limit_store.clone()))
                    .configure(api::configure_routes),
            )
    });

    server.workers(worker_count).bind(&bind_address)?.run().await?;

    info!("Server stopped, flushing pending activity and notifications");
    outbox.flush().await;
    Ok(())
}
