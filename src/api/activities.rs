//! Activity log read endpoints.

use actix_web::{get, web, HttpResponse};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::activities::ActivityFilter;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::activity::{ActivityListQuery, EntityKind};
use crate::models::{Paginated, PaginationParams};
use crate::services::activity::{activity_scope, enrich};

/// Configure activity routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_activities).service(entity_history);
}

#[utoipa::path(
    get,
    path = "/api/actividades",
    tag = "Activities",
    params(
        ("entidad" = Option<EntityKind>, Query, description = "Filter by entity kind"),
        ("accion" = Option<crate::models::activity::ActivityAction>, Query, description = "Filter by action"),
        ("proyectoId" = Option<Uuid>, Query, description = "Restrict to one project"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated activity entries (`data` + `pagination`)", body = Vec<crate::models::activity::ActivityResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/actividades")]
pub async fn list_activities(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    query: web::Query<ActivityListQuery>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let scope = activity_scope(&pool, &auth.user, query.project_id).await?;
    let filter = ActivityFilter {
        entity: query.entity,
        entity_id: None,
        action: query.action,
    };

    let (rows, total) = pool.list_activities(&scope, &filter, &page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: enrich(&pool, rows).await?,
        pagination: page.paginate(total),
    }))
}

/// History of one record, under the caller's usual visibility.
#[utoipa::path(
    get,
    path = "/api/actividades/{entidad}/{id}",
    tag = "Activities",
    params(
        ("entidad" = EntityKind, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated history of one record (`data` + `pagination`)", body = Vec<crate::models::activity::ActivityResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/actividades/{entidad}/{id}")]
pub async fn entity_history(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<(EntityKind, Uuid)>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (entity, entity_id) = path.into_inner();
    let scope = activity_scope(&pool, &auth.user, None).await?;
    let filter = ActivityFilter {
        entity: Some(entity),
        entity_id: Some(entity_id),
        action: None,
    };

    let (rows, total) = pool.list_activities(&scope, &filter, &page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: enrich(&pool, rows).await?,
        pagination: page.paginate(total),
    }))
}
