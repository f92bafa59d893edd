//! Dashboard statistics.

use actix_web::{get, web, HttpResponse};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::project::ProjectResponse;
use crate::models::stats::{completion_percentage, DashboardStats, ProjectStats};
use crate::services::permissions::ensure_project_visible;

/// Configure statistics routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard).service(project_stats);
}

/// Totals over every project the caller can see.
#[utoipa::path(
    get,
    path = "/api/estadisticas",
    tag = "Statistics",
    responses(
        (status = 200, description = "Dashboard totals over visible projects", body = DashboardStats),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/estadisticas")]
pub async fn dashboard(pool: web::Data<DbPool>, auth: AuthUser) -> AppResult<HttpResponse> {
    let visible = if auth.user.is_admin() {
        None
    } else {
        Some(pool.visible_project_ids(auth.user.id).await?)
    };
    let scope = visible.as_deref();

    Ok(HttpResponse::Ok().json(DashboardStats {
        total_projects: pool.count_projects(scope).await?,
        tasks_by_status: pool.task_status_counts(scope).await?,
        overdue_tasks: pool.overdue_task_count(scope).await?,
        tasks_by_assignee: pool.tasks_by_assignee(scope).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/api/estadisticas/proyecto/{id}",
    tag = "Statistics",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project statistics", body = ProjectStats),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/estadisticas/proyecto/{id}")]
pub async fn project_stats(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = pool.get_project(path.into_inner()).await?;
    ensure_project_visible(&pool, &auth.user, &project).await?;

    let scope = [project.id];
    let tasks_by_status = pool.task_status_counts(Some(&scope)).await?;
    let completion = completion_percentage(tasks_by_status.completed, tasks_by_status.total);

    Ok(HttpResponse::Ok().json(ProjectStats {
        overdue_tasks: pool.overdue_task_count(Some(&scope)).await?,
        tasks_by_assignee: pool.tasks_by_assignee(Some(&scope)).await?,
        tasks_by_status,
        completion_percentage: completion,
        project: ProjectResponse::from(project),
    }))
}
