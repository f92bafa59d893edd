//! Releases of a project.

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::releases::NewRelease;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::release::{CreateReleaseRequest, ReleaseResponse, UpdateReleaseRequest};
use crate::models::sprint::ProjectScopedQuery;
use crate::models::{
    ActivityAction, EntityKind, EntityRef, MessageResponse, NewActivity, Paginated,
    PaginationParams,
};
use crate::services::activity::{compute_changes, snapshot};
use crate::services::permissions::{ensure_project_visible, require, resolve_project};
use crate::services::Outbox;

const EDIT_DENIED: &str = "No tienes permiso para gestionar los releases de este proyecto";

/// Configure release routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_releases)
        .service(get_release)
        .service(create_release)
        .service(update_release)
        .service(delete_release);
}

fn release_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Release, id)
}

#[utoipa::path(
    get,
    path = "/api/releases",
    tag = "Releases",
    params(
        ("proyectoId" = Option<Uuid>, Query, description = "Filter by project"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated releases (`data` + `pagination`)", body = Vec<ReleaseResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/releases")]
pub async fn list_releases(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    filter: web::Query<ProjectScopedQuery>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (releases, total) = pool
        .list_releases(&auth.user, filter.project_id, &page)
        .await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: releases
            .into_iter()
            .map(ReleaseResponse::from)
            .collect::<Vec<_>>(),
        pagination: page.paginate(total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/releases/{id}",
    tag = "Releases",
    params(
        ("id" = Uuid, Path, description = "Release ID")
    ),
    responses(
        (status = 200, description = "Release", body = ReleaseResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Release not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/releases/{id}")]
pub async fn get_release(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let release = pool.get_release(path.into_inner()).await?;
    let project = pool.get_project(release.project_id).await?;
    ensure_project_visible(&pool, &auth.user, &project).await?;
    Ok(HttpResponse::Ok().json(ReleaseResponse::from(release)))
}

#[utoipa::path(
    post,
    path = "/api/releases",
    tag = "Releases",
    request_body = CreateReleaseRequest,
    responses(
        (status = 201, description = "Release created", body = ReleaseResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/releases")]
pub async fn create_release(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateReleaseRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let access = resolve_project(&pool, auth.user.id, body.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    let body = body.into_inner();
    let release = pool
        .insert_release(NewRelease {
            project_id: access.project.id,
            name: body.name,
            version: body.version,
            description: body.description,
            release_date: body.release_date,
            status: body.status.unwrap_or_default(),
        })
        .await?;

    let title = format!("{} {}", release.name, release.version);
    outbox.record(NewActivity::new(
        ActivityAction::Create,
        release_ref(release.id),
        auth.user.id,
        &title,
        "creado",
    ));

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Release creado",
        ReleaseResponse::from(release),
    )))
}

#[utoipa::path(
    put,
    path = "/api/releases/{id}",
    tag = "Releases",
    params(
        ("id" = Uuid, Path, description = "Release ID")
    ),
    request_body = UpdateReleaseRequest,
    responses(
        (status = 200, description = "Release updated", body = ReleaseResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Release not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/releases/{id}")]
pub async fn update_release(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateReleaseRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let existing = pool.get_release(path.into_inner()).await?;
    let access = resolve_project(&pool, auth.user.id, existing.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    let before = snapshot(&ReleaseResponse::from(existing.clone()));
    let updated = pool.update_release(existing, &body).await?;
    let after = snapshot(&ReleaseResponse::from(updated.clone()));

    let title = format!("{} {}", updated.name, updated.version);
    outbox.record_activity(NewActivity::for_changes(
        release_ref(updated.id),
        auth.user.id,
        &title,
        compute_changes(&before, &after, &body.submitted_fields()),
    ));

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Release actualizado",
        ReleaseResponse::from(updated),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/releases/{id}",
    tag = "Releases",
    params(
        ("id" = Uuid, Path, description = "Release ID")
    ),
    responses(
        (status = 200, description = "Release deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Release not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/releases/{id}")]
pub async fn delete_release(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let release = pool.get_release(path.into_inner()).await?;
    let access = resolve_project(&pool, auth.user.id, release.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    pool.delete_release(release.id).await?;
    let title = format!("{} {}", release.name, release.version);
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        release_ref(release.id),
        auth.user.id,
        &title,
        "eliminado",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Release eliminado" })))
}
