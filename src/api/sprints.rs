//! Sprints of a project.

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::sprints::NewSprint;
use crate::db::DbPool;
use crate::entity::sprint;
use crate::error::AppResult;
use crate::models::sprint::{
    CreateSprintRequest, ProjectScopedQuery, SprintResponse, UpdateSprintRequest,
};
use crate::models::{
    validate_date_range, ActivityAction, EntityKind, EntityRef, MessageResponse, NewActivity,
    Paginated, PaginationParams,
};
use crate::services::activity::{compute_changes, snapshot};
use crate::services::permissions::{ensure_project_visible, require, resolve_project};
use crate::services::Outbox;

const EDIT_DENIED: &str = "No tienes permiso para gestionar los sprints de este proyecto";

/// Configure sprint routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_sprints)
        .service(get_sprint)
        .service(create_sprint)
        .service(update_sprint)
        .service(delete_sprint);
}

fn sprint_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Sprint, id)
}

async fn with_counts(pool: &DbPool, sprints: Vec<sprint::Model>) -> AppResult<Vec<SprintResponse>> {
    let ids: Vec<Uuid> = sprints.iter().map(|s| s.id).collect();
    let mut counts = pool.sprint_task_counts(&ids).await?;
    Ok(sprints
        .into_iter()
        .map(|s| {
            let c = counts.remove(&s.id).unwrap_or_default();
            SprintResponse::new(s, c)
        })
        .collect())
}

async fn with_count(pool: &DbPool, sprint: sprint::Model) -> AppResult<SprintResponse> {
    let counts = pool
        .sprint_task_counts(&[sprint.id])
        .await?
        .remove(&sprint.id)
        .unwrap_or_default();
    Ok(SprintResponse::new(sprint, counts))
}

#[utoipa::path(
    get,
    path = "/api/sprints",
    tag = "Sprints",
    params(
        ("proyectoId" = Option<Uuid>, Query, description = "Filter by project"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated sprints (`data` + `pagination`)", body = Vec<SprintResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/sprints")]
pub async fn list_sprints(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    filter: web::Query<ProjectScopedQuery>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (sprints, total) = pool
        .list_sprints(&auth.user, filter.project_id, &page)
        .await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: with_counts(&pool, sprints).await?,
        pagination: page.paginate(total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/sprints/{id}",
    tag = "Sprints",
    params(
        ("id" = Uuid, Path, description = "Sprint ID")
    ),
    responses(
        (status = 200, description = "Sprint with task count", body = SprintResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Sprint not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/sprints/{id}")]
pub async fn get_sprint(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let sprint = pool.get_sprint(path.into_inner()).await?;
    let project = pool.get_project(sprint.project_id).await?;
    ensure_project_visible(&pool, &auth.user, &project).await?;

    Ok(HttpResponse::Ok().json(with_count(&pool, sprint).await?))
}

#[utoipa::path(
    post,
    path = "/api/sprints",
    tag = "Sprints",
    request_body = CreateSprintRequest,
    responses(
        (status = 201, description = "Sprint created", body = SprintResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/sprints")]
pub async fn create_sprint(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateSprintRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    validate_date_range(Some(body.start_date), Some(body.end_date), "fechaFin")?;
    let access = resolve_project(&pool, auth.user.id, body.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    let body = body.into_inner();
    let sprint = pool
        .insert_sprint(NewSprint {
            project_id: access.project.id,
            name: body.name,
            goal: body.goal,
            start_date: body.start_date,
            end_date: body.end_date,
        })
        .await?;

    outbox.record(NewActivity::new(
        ActivityAction::Create,
        sprint_ref(sprint.id),
        auth.user.id,
        &sprint.name,
        "creado",
    ));

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Sprint creado",
        SprintResponse::new(sprint, Default::default()),
    )))
}

#[utoipa::path(
    put,
    path = "/api/sprints/{id}",
    tag = "Sprints",
    params(
        ("id" = Uuid, Path, description = "Sprint ID")
    ),
    request_body = UpdateSprintRequest,
    responses(
        (status = 200, description = "Sprint updated", body = SprintResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Sprint not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/sprints/{id}")]
pub async fn update_sprint(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateSprintRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let existing = pool.get_sprint(path.into_inner()).await?;
    let access = resolve_project(&pool, auth.user.id, existing.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    validate_date_range(
        Some(body.start_date.unwrap_or(existing.start_date)),
        Some(body.end_date.unwrap_or(existing.end_date)),
        "fechaFin",
    )?;

    let before = snapshot(&SprintResponse::new(existing.clone(), Default::default()));
    let updated = pool.update_sprint(existing, &body).await?;
    let after = snapshot(&SprintResponse::new(updated.clone(), Default::default()));

    outbox.record_activity(NewActivity::for_changes(
        sprint_ref(updated.id),
        auth.user.id,
        &updated.name,
        compute_changes(&before, &after, &body.submitted_fields()),
    ));

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Sprint actualizado",
        with_count(&pool, updated).await?,
    )))
}

/// Tasks of a deleted sprint stay in the project without a sprint.
#[utoipa::path(
    delete,
    path = "/api/sprints/{id}",
    tag = "Sprints",
    params(
        ("id" = Uuid, Path, description = "Sprint ID")
    ),
    responses(
        (status = 200, description = "Sprint deleted, its tasks return to the backlog"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Sprint not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/sprints/{id}")]
pub async fn delete_sprint(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let sprint = pool.get_sprint(path.into_inner()).await?;
    let access = resolve_project(&pool, auth.user.id, sprint.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    pool.delete_sprint(sprint.id).await?;
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        sprint_ref(sprint.id),
        auth.user.id,
        &sprint.name,
        "eliminado",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Sprint eliminado" })))
}
