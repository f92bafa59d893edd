//! Issue reports (bugs, suggestions) sent to the administrators.

use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthUser};
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::issue::{
    CreateIssueRequest, IssueListQuery, IssueResponse, UpdateIssueStatusRequest,
};
use crate::models::{
    ActivityAction, EntityKind, EntityRef, FieldChange, MessageResponse, NewActivity,
    NotificationDraft, Paginated, PaginationParams,
};
use crate::services::permissions::require;
use crate::services::Outbox;

/// Configure issue routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_issues)
        .service(create_issue)
        .service(update_issue_status)
        .service(delete_issue);
}

fn issue_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Issue, id)
}

#[utoipa::path(
    get,
    path = "/api/issues",
    tag = "Issues",
    params(
        ("estado" = Option<crate::models::issue::IssueStatus>, Query, description = "Filter by status"),
        ("tipo" = Option<crate::models::issue::IssueKind>, Query, description = "Filter by kind"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated issues (`data` + `pagination`)", body = Vec<IssueResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/issues")]
pub async fn list_issues(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    query: web::Query<IssueListQuery>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (issues, total) = pool.list_issues(&auth.user, &query, &page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: issues.into_iter().map(IssueResponse::from).collect::<Vec<_>>(),
        pagination: page.paginate(total),
    }))
}

#[utoipa::path(
    post,
    path = "/api/issues",
    tag = "Issues",
    request_body = CreateIssueRequest,
    responses(
        (status = 201, description = "Issue reported", body = IssueResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/issues")]
pub async fn create_issue(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateIssueRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    if let Some(project_id) = body.project_id {
        pool.get_project(project_id).await?;
    }

    let issue = pool
        .insert_issue(
            auth.user.id,
            body.project_id,
            &body.title,
            &body.description,
            body.kind.unwrap_or_default(),
        )
        .await?;

    outbox.record(NewActivity::new(
        ActivityAction::Create,
        issue_ref(issue.id),
        auth.user.id,
        &issue.title,
        "reportado",
    ));
    outbox.notify(NotificationDraft::issue_reported(&issue));

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Issue reportado",
        IssueResponse::from(issue),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/issues/{id}/estado",
    tag = "Issues",
    params(
        ("id" = Uuid, Path, description = "Issue ID")
    ),
    request_body = UpdateIssueStatusRequest,
    responses(
        (status = 200, description = "Issue status updated", body = IssueResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse),
        (status = 404, description = "Issue not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[patch("/issues/{id}/estado")]
pub async fn update_issue_status(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateIssueStatusRequest>,
) -> AppResult<HttpResponse> {
    let existing = pool.get_issue(path.into_inner()).await?;
    let old_status = existing.status.clone();
    let updated = pool.update_issue_status(existing, body.status).await?;

    if updated.status != old_status {
        outbox.record(
            NewActivity::new(
                ActivityAction::ChangeStatus,
                issue_ref(updated.id),
                admin.user.id,
                &updated.title,
                &format!("cambió a {}", updated.status),
            )
            .with_change(FieldChange {
                field: "estado".to_string(),
                old_value: Some(old_status),
                new_value: Some(updated.status.clone()),
            }),
        );
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Estado del issue actualizado",
        IssueResponse::from(updated),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/issues/{id}",
    tag = "Issues",
    params(
        ("id" = Uuid, Path, description = "Issue ID")
    ),
    responses(
        (status = 200, description = "Issue deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Issue not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/issues/{id}")]
pub async fn delete_issue(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let issue = pool.get_issue(path.into_inner()).await?;
    require(
        auth.user.is_admin() || issue.reporter_id == auth.user.id,
        "Solo el autor o un administrador puede eliminar el issue",
    )?;

    pool.delete_issue(issue.id).await?;
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        issue_ref(issue.id),
        auth.user.id,
        &issue.title,
        "eliminado",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Issue eliminado" })))
}
