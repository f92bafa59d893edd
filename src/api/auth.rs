//! Login, token refresh, logout and password reset.

use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthUser, JwtKeys};
use crate::config::Config;
use crate::db::refresh_tokens::{generate_token, hash_token};
use crate::db::DbPool;
use crate::entity::user;
use crate::error::{AppError, AppResult};
use crate::models::user::{
    ForgotPasswordRequest, LoginRequest, RefreshRequest, ResetPasswordRequest, TokenPair,
    UserResponse,
};
use crate::models::{MessageResponse, Role};
use crate::services::Mailer;

/// Reset links stay valid for one hour.
const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Configure authentication routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(refresh)
        .service(logout)
        .service(me)
        .service(forgot_password)
        .service(reset_password);
}

async fn issue_token_pair(
    pool: &DbPool,
    keys: &JwtKeys,
    config: &Config,
    user: user::Model,
) -> AppResult<TokenPair> {
    let role = Role::parse(&user.role).unwrap_or_default();
    let access_token = keys.issue(user.id, role)?;

    let refresh_token = generate_token("rt");
    pool.insert_refresh_token(
        user.id,
        &hash_token(&refresh_token),
        config.auth.refresh_token_ttl_secs,
    )
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: keys.access_ttl_secs(),
        user: UserResponse::from(user),
    })
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Credenciales inválidas".to_string())
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Wrong email or password", body = crate::error::ErrorResponse),
    )
)]
#[post("/auth/login")]
pub async fn login(
    pool: web::Data<DbPool>,
    keys: web::Data<JwtKeys>,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;

    let user = pool
        .find_user_by_email(&body.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify_password(&body.password, &user.password_hash) {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid_credentials());
    }

    info!(user_id = %user.id, "User logged in");
    let pair = issue_token_pair(&pool, &keys, &config, user).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Inicio de sesión exitoso", pair)))
}

/// Rotate a refresh token: the presented one is revoked, a new pair issued.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = crate::error::ErrorResponse),
    )
)]
#[post("/auth/refresh")]
pub async fn refresh(
    pool: web::Data<DbPool>,
    keys: web::Data<JwtKeys>,
    config: web::Data<Config>,
    body: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;

    let token_hash = hash_token(&body.refresh_token);
    let user_id = pool
        .find_valid_refresh_token(&token_hash)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Refresh token inválido o expirado".to_string()))?;

    if !pool.revoke_refresh_token(&token_hash).await? {
        return Err(AppError::Unauthorized("Refresh token inválido o expirado".to_string()));
    }

    let user = pool
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Usuario no encontrado".to_string()))?;

    let pair = issue_token_pair(&pool, &keys, &config, user).await?;
    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Session closed"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/auth/logout")]
pub async fn logout(
    pool: web::Data<DbPool>,
    _auth: AuthUser,
    body: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    pool.revoke_refresh_token(&hash_token(&body.refresh_token))
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Sesión cerrada" })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/auth/me")]
pub async fn me(pool: web::Data<DbPool>, auth: AuthUser) -> AppResult<HttpResponse> {
    let user = pool.get_user(auth.user.id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Always answers 200 so the endpoint cannot be used to probe for accounts.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset instructions sent if the email is registered"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
    )
)]
#[post("/auth/forgot-password")]
pub async fn forgot_password(
    pool: web::Data<DbPool>,
    mailer: web::Data<Mailer>,
    body: web::Json<ForgotPasswordRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;

    if let Some(user) = pool.find_user_by_email(&body.email).await? {
        let token = generate_token("rp");
        let expires_at = Utc::now() + chrono::Duration::seconds(RESET_TOKEN_TTL_SECS);
        pool.set_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;

        if let Err(e) = mailer
            .send_password_reset(&user.email, &user.name, &token)
            .await
        {
            warn!(user_id = %user.id, error = %e, "Password reset email failed");
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Si el email está registrado, recibirás instrucciones para restablecer tu contraseña"
    })))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Reset token invalid or expired", body = crate::error::ErrorResponse),
    )
)]
#[post("/auth/reset-password")]
pub async fn reset_password(
    pool: web::Data<DbPool>,
    body: web::Json<ResetPasswordRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;

    let user = pool
        .find_user_by_reset_token(&hash_token(&body.token))
        .await?
        .ok_or_else(|| AppError::InvalidInput("Token inválido o expirado".to_string()))?;

    let password_hash = hash_password(&body.password)?;
    pool.complete_password_reset(user.id, password_hash).await?;
    let revoked = pool.revoke_user_refresh_tokens(user.id).await?;
    info!(user_id = %user.id, revoked, "Password reset completed");

    Ok(HttpResponse::Ok().json(json!({ "message": "Contraseña actualizada" })))
}
