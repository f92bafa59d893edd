//! Shared test helpers for API E2E tests.

use std::path::Path;

use actix_web::{App, dev::ServiceResponse, test, web};
use secrecy::SecretString;
use serde_json::Value;
use tablero_lib::api;
use tablero_lib::auth::{JwtKeys, hash_password};
use tablero_lib::config::{
    AuthSettings, Config, DatabaseSettings, Environment, GitHubSettings, RateLimitSettings,
    SmtpSettings, UploadSettings, defaults,
};
use tablero_lib::db::DbPool;
use tablero_lib::db::users::NewUser;
use tablero_lib::entity::user;
use tablero_lib::models::Role;
use tablero_lib::services::{GitHubClient, LocalStorage, Mailer, Outbox};
use tokio::sync::OnceCell;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "api-e2e-test-secret";

static MIGRATIONS_RUN: OnceCell<()> = OnceCell::const_new();

/// Development configuration pointing at the test database.
pub fn test_config(database_url: &str, upload_dir: &Path) -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseSettings {
            url: database_url.to_string(),
            max_connections: 2,
            min_connections: 1,
        },
        auth: AuthSettings {
            jwt_secret: SecretString::from(TEST_JWT_SECRET),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 3600,
        },
        uploads: UploadSettings {
            dir: upload_dir.to_path_buf(),
            max_file_size: defaults::DEV_MAX_FILE_SIZE,
            max_task_total_size: defaults::DEV_MAX_TASK_ATTACHMENTS_SIZE,
        },
        github: GitHubSettings {
            fallback_token: None,
            token_encryption_key: SecretString::from(defaults::DEV_TOKEN_ENCRYPTION_KEY),
            api_base_url: "http://127.0.0.1:9".to_string(),
        },
        smtp: SmtpSettings {
            host: None,
            port: 587,
            username: None,
            password: None,
            from: defaults::DEV_MAIL_FROM.to_string(),
        },
        rate_limit: RateLimitSettings {
            max_requests: 1000,
            window_secs: 60,
        },
        cors_origins: vec![],
        frontend_url: defaults::DEV_FRONTEND_URL.to_string(),
        memory_degraded_mb: defaults::DEV_MEMORY_DEGRADED_MB,
    }
}

/// Everything a test needs; `None` when no test database is configured.
pub struct TestContext {
    pub pool: DbPool,
    pub config: Config,
    pub outbox: Outbox,
    _uploads: tempfile::TempDir,
}

pub async fn setup() -> Option<TestContext> {
    let Ok(url) = std::env::var("TABLERO_TEST_DATABASE_URL") else {
        eprintln!("TABLERO_TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    let config = test_config(&url, uploads.path());

    let pool = DbPool::new(&config.database)
        .await
        .expect("Failed to connect to test database");
    MIGRATIONS_RUN
        .get_or_init(|| async {
            pool.run_migrations()
                .await
                .expect("Failed to run migrations");
        })
        .await;

    let outbox = Outbox::start(pool.clone());
    Some(TestContext {
        pool,
        config,
        outbox,
        _uploads: uploads,
    })
}

/// Insert a user with a unique email and return it with an access token.
pub async fn create_user(ctx: &TestContext, role: Role) -> (user::Model, String) {
    let email = format!("e2e-{}@tablero.test", Uuid::new_v4().simple());
    let user = ctx
        .pool
        .insert_user(NewUser {
            name: "Usuario E2E",
            email: &email,
            password_hash: hash_password("contraseña-segura").expect("hash"),
            role,
        })
        .await
        .expect("Failed to insert user");

    let keys = JwtKeys::from_settings(&ctx.config.auth);
    let token = keys.issue(user.id, role).expect("Failed to issue token");
    (user, token)
}

/// Create a test Tablero app mounted under `/api`.
pub async fn create_test_app(
    ctx: &TestContext,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    let storage = LocalStorage::new(&ctx.config.uploads)
        .await
        .expect("Failed to prepare storage");
    let github = GitHubClient::new(&ctx.config.github).expect("Failed to build GitHub client");
    let mailer = Mailer::from_config(&ctx.config).expect("Failed to build mailer");

    test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(ctx.config.clone()))
            .app_data(web::Data::new(ctx.outbox.clone()))
            .app_data(web::Data::new(JwtKeys::from_settings(&ctx.config.auth)))
            .app_data(web::Data::new(storage))
            .app_data(web::Data::new(github))
            .app_data(web::Data::new(mailer))
            .app_data(web::Data::new(api::StartedAt::now()))
            .configure(api::configure_health_routes)
            .service(web::scope("/api").configure(api::configure_routes)),
    )
    .await
}

/// Send a JSON request and return status plus parsed body.
pub async fn send<S>(
    app: &S,
    req: test::TestRequest,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value)
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut req = req;
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {}", token)));
    }
    if let Some(body) = body {
        req = req.set_json(body);
    }
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Create a project owned and managed by the token holder; returns its id.
pub async fn create_project<S>(app: &S, token: &str) -> Uuid
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = send(
        app,
        test::TestRequest::post().uri("/api/proyectos"),
        Some(token),
        Some(serde_json::json!({ "nombre": "Proyecto E2E" })),
    )
    .await;
    assert_eq!(status, 201, "Failed to create project: {}", body);
    parse_id(&body)
}

/// Create a task in a project; returns its id.
pub async fn create_task<S>(app: &S, token: &str, project_id: Uuid, title: &str) -> Uuid
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = send(
        app,
        test::TestRequest::post().uri("/api/tareas"),
        Some(token),
        Some(serde_json::json!({ "titulo": title, "proyectoId": project_id })),
    )
    .await;
    assert_eq!(status, 201, "Failed to create task: {}", body);
    parse_id(&body)
}

pub fn parse_id(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("Response has no id: {}", body))
}
