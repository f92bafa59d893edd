//! The caller's own notifications.

use actix_web::{delete, get, patch, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::notification::{
    NotificationListQuery, NotificationResponse, UnreadCountResponse,
};
use crate::models::{Paginated, PaginationParams};

/// Configure notification routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_notifications)
        .service(unread_count)
        .service(mark_all_read)
        .service(mark_read)
        .service(delete_notification);
}

#[utoipa::path(
    get,
    path = "/api/notificaciones",
    tag = "Notifications",
    params(
        ("leida" = Option<bool>, Query, description = "Filter by read state"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated notifications (`data` + `pagination`)", body = Vec<NotificationResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/notificaciones")]
pub async fn list_notifications(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    query: web::Query<NotificationListQuery>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (rows, total) = pool.list_notifications(&auth.user, &query, &page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: rows
            .into_iter()
            .map(NotificationResponse::from)
            .collect::<Vec<_>>(),
        pagination: page.paginate(total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/notificaciones/no-leidas",
    tag = "Notifications",
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/notificaciones/no-leidas")]
pub async fn unread_count(pool: web::Data<DbPool>, auth: AuthUser) -> AppResult<HttpResponse> {
    let unread = pool.count_unread_notifications(&auth.user).await?;
    Ok(HttpResponse::Ok().json(UnreadCountResponse { unread }))
}

#[utoipa::path(
    patch,
    path = "/api/notificaciones/leer-todas",
    tag = "Notifications",
    responses(
        (status = 200, description = "All notifications marked read"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[patch("/notificaciones/leer-todas")]
pub async fn mark_all_read(pool: web::Data<DbPool>, auth: AuthUser) -> AppResult<HttpResponse> {
    let updated = pool.mark_all_notifications_read(&auth.user).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Notificaciones marcadas como leídas",
        "actualizadas": updated,
    })))
}

#[utoipa::path(
    patch,
    path = "/api/notificaciones/{id}/leer",
    tag = "Notifications",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked read"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[patch("/notificaciones/{id}/leer")]
pub async fn mark_read(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    pool.mark_notification_read(&auth.user, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Notificación marcada como leída" })))
}

#[utoipa::path(
    delete,
    path = "/api/notificaciones/{id}",
    tag = "Notifications",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/notificaciones/{id}")]
pub async fn delete_notification(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    pool.delete_notification(&auth.user, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Notificación eliminada" })))
}
