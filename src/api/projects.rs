//! Projects and project membership.

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::projects::NewProject;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::project::{
    AddMemberRequest, CreateProjectRequest, MemberResponse, ProjectResponse, UpdateProjectRequest,
};
use crate::models::{
    validate_date_range, ActivityAction, EntityKind, EntityRef, MessageResponse, NewActivity,
    NotificationDraft, Paginated, PaginationParams,
};
use crate::services::activity::{compute_changes, snapshot};
use crate::services::permissions::{ensure_project_visible, require, resolve_project};
use crate::services::{LocalStorage, Outbox};

/// Configure project routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_projects)
        .service(get_project)
        .service(create_project)
        .service(update_project)
        .service(delete_project)
        .service(list_members)
        .service(add_member)
        .service(remove_member);
}

fn project_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Project, id)
}

#[utoipa::path(
    get,
    path = "/api/proyectos",
    tag = "Projects",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated visible projects (`data` + `pagination`)", body = Vec<ProjectResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/proyectos")]
pub async fn list_projects(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (projects, total) = pool.list_projects(&auth.user, &page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: projects
            .into_iter()
            .map(ProjectResponse::from)
            .collect::<Vec<_>>(),
        pagination: page.paginate(total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/proyectos/{id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project", body = ProjectResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/proyectos/{id}")]
pub async fn get_project(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = pool.get_project(path.into_inner()).await?;
    ensure_project_visible(&pool, &auth.user, &project).await?;
    Ok(HttpResponse::Ok().json(ProjectResponse::from(project)))
}

#[utoipa::path(
    post,
    path = "/api/proyectos",
    tag = "Projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrators and managers only", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/proyectos")]
pub async fn create_project(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateProjectRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    validate_date_range(body.start_date, body.end_date, "fechaFin")?;
    let actor = auth.user;

    let manager_id = match body.manager_id {
        Some(id) => pool.get_user(id).await?.id,
        None => actor.id,
    };

    let body = body.into_inner();
    let project = pool
        .insert_project(NewProject {
            name: body.name,
            description: body.description,
            creator_id: actor.id,
            manager_id,
            start_date: body.start_date,
            end_date: body.end_date,
        })
        .await?;

    info!(project_id = %project.id, creator = %actor.id, "Project created");
    outbox.record(NewActivity::new(
        ActivityAction::Create,
        project_ref(project.id),
        actor.id,
        &project.name,
        "creado",
    ));
    if let Some(draft) = NotificationDraft::project_added(actor.id, manager_id, &project) {
        outbox.notify(draft);
    }

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Proyecto creado",
        ProjectResponse::from(project),
    )))
}

#[utoipa::path(
    put,
    path = "/api/proyectos/{id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/proyectos/{id}")]
pub async fn update_project(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProjectRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let actor = auth.user;
    let access = resolve_project(&pool, actor.id, path.into_inner()).await?;
    require(
        access.permissions.can_edit(),
        "No tienes permiso para editar este proyecto",
    )?;

    let existing = access.project;
    let manager_changed = body.manager_id.is_some_and(|id| id != existing.manager_id);
    if manager_changed {
        require(
            access.permissions.can_administer(),
            "Solo el creador o un administrador puede cambiar el gerente",
        )?;
    }
    if let Some(manager_id) = body.manager_id {
        pool.get_user(manager_id).await?;
    }

    let start = body.start_date.unwrap_or(existing.start_date);
    let end = body.end_date.unwrap_or(existing.end_date);
    validate_date_range(start, end, "fechaFin")?;

    let before = snapshot(&ProjectResponse::from(existing.clone()));
    let updated = pool.update_project(existing, &body).await?;
    let after = snapshot(&ProjectResponse::from(updated.clone()));

    let changes = compute_changes(&before, &after, &body.submitted_fields());
    outbox.record_activity(NewActivity::for_changes(
        project_ref(updated.id),
        actor.id,
        &updated.name,
        changes,
    ));
    if manager_changed {
        if let Some(draft) = NotificationDraft::project_added(actor.id, updated.manager_id, &updated)
        {
            outbox.notify(draft);
        }
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Proyecto actualizado",
        ProjectResponse::from(updated),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/proyectos/{id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project and its contents deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/proyectos/{id}")]
pub async fn delete_project(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    storage: web::Data<LocalStorage>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = auth.user;
    let access = resolve_project(&pool, actor.id, path.into_inner()).await?;
    require(
        access.permissions.can_administer(),
        "Solo el creador o un administrador puede eliminar el proyecto",
    )?;
    let project = access.project;

    // Attachment rows cascade with the tasks; their files do not.
    let mut stored_names = Vec::new();
    for task_id in pool.task_ids_in_projects(&[project.id]).await? {
        stored_names.extend(pool.stored_names_for_task(task_id).await?);
    }

    pool.delete_project(project.id).await?;
    for name in &stored_names {
        storage.remove(name).await;
    }

    info!(project_id = %project.id, deleted_by = %actor.id, files = stored_names.len(), "Project deleted");
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        project_ref(project.id),
        actor.id,
        &project.name,
        "eliminado",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Proyecto eliminado" })))
}

#[utoipa::path(
    get,
    path = "/api/proyectos/{id}/miembros",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project members", body = Vec<MemberResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/proyectos/{id}/miembros")]
pub async fn list_members(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = pool.get_project(path.into_inner()).await?;
    ensure_project_visible(&pool, &auth.user, &project).await?;

    let members: Vec<MemberResponse> = pool
        .project_members(&project)
        .await?
        .into_iter()
        .map(|user| MemberResponse::new(user, &project))
        .collect();
    Ok(HttpResponse::Ok().json(members))
}

#[utoipa::path(
    post,
    path = "/api/proyectos/{id}/miembros",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = MemberResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project or user not found", body = crate::error::ErrorResponse),
        (status = 409, description = "User is already a member", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/proyectos/{id}/miembros")]
pub async fn add_member(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<AddMemberRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.user;
    let access = resolve_project(&pool, actor.id, path.into_inner()).await?;
    require(
        access.permissions.can_edit(),
        "No tienes permiso para gestionar los miembros de este proyecto",
    )?;
    let project = access.project;
    let user = pool.get_user(body.user_id).await?;

    if !pool.add_project_member(project.id, user.id).await? {
        return Err(AppError::Conflict(
            "El usuario ya es miembro del proyecto".to_string(),
        ));
    }

    info!(project_id = %project.id, user_id = %user.id, "Member added");
    if let Some(draft) = NotificationDraft::project_added(actor.id, user.id, &project) {
        outbox.notify(draft);
    }

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Miembro agregado",
        MemberResponse::new(user, &project),
    )))
}

/// Creator and manager belong to the project by definition and cannot be removed.
#[utoipa::path(
    delete,
    path = "/api/proyectos/{id}/miembros/{usuario_id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project ID"),
        ("usuario_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Membership not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Creator and manager cannot be removed", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/proyectos/{id}/miembros/{usuario_id}")]
pub async fn remove_member(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (project_id, user_id) = path.into_inner();
    let access = resolve_project(&pool, auth.user.id, project_id).await?;
    require(
        access.permissions.can_edit(),
        "No tienes permiso para gestionar los miembros de este proyecto",
    )?;
    let project = access.project;

    if user_id == project.creator_id || user_id == project.manager_id {
        return Err(AppError::Conflict(
            "No se puede quitar al creador ni al gerente del proyecto".to_string(),
        ));
    }
    if !pool.remove_project_member(project.id, user_id).await? {
        return Err(AppError::NotFound("Miembro".to_string()));
    }

    info!(project_id = %project.id, %user_id, "Member removed");
    Ok(HttpResponse::Ok().json(json!({ "message": "Miembro eliminado" })))
}
