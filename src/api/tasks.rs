//! Kanban tasks: CRUD, status moves, assignment and tags.

use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use sea_orm::Set;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::tasks::NewTask;
use crate::db::DbPool;
use crate::entity::{project, task};
use crate::error::{AppError, AppResult};
use crate::models::task::{
    AssignTaskRequest, ChangeStatusRequest, CreateTaskRequest, TaskListQuery, TaskResponse,
    UpdateTaskRequest, DEFAULT_PRIORITY,
};
use crate::models::{
    ActivityAction, EntityKind, EntityRef, FieldChange, MessageResponse, NewActivity,
    NotificationDraft, Paginated, PaginationParams, TaskAssignment, TaskStatus,
};
use crate::services::activity::{compute_changes, snapshot};
use crate::services::permissions::{
    can_self_assign, ensure_project_visible, require, resolve_task,
};
use crate::services::{LocalStorage, Outbox};

const EDIT_DENIED: &str = "No tienes permiso para editar esta tarea";

/// Configure task routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_tasks)
        .service(get_task)
        .service(create_task)
        .service(update_task)
        .service(change_status)
        .service(assign_task)
        .service(delete_task)
        .service(attach_tag)
        .service(detach_tag);
}

fn task_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Task, id)
}

/// Sprints and releases must belong to the task's project.
async fn check_planning_refs(
    pool: &DbPool,
    project: &project::Model,
    sprint_id: Option<Uuid>,
    release_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(id) = sprint_id {
        if pool.get_sprint(id).await?.project_id != project.id {
            return Err(AppError::InvalidInput(
                "El sprint no pertenece al proyecto".to_string(),
            ));
        }
    }
    if let Some(id) = release_id {
        if pool.get_release(id).await?.project_id != project.id {
            return Err(AppError::InvalidInput(
                "El release no pertenece al proyecto".to_string(),
            ));
        }
    }
    Ok(())
}

async fn assignment_for(pool: &DbPool, user_id: Option<Uuid>) -> AppResult<TaskAssignment> {
    match user_id {
        Some(id) => Ok(TaskAssignment::to(&pool.get_user(id).await?)),
        None => Ok(TaskAssignment::unassigned()),
    }
}

fn status_of(task: &task::Model) -> TaskStatus {
    TaskStatus::parse(&task.status).unwrap_or_default()
}

#[utoipa::path(
    get,
    path = "/api/tareas",
    tag = "Tasks",
    params(
        ("proyectoId" = Option<Uuid>, Query, description = "Filter by project"),
        ("estado" = Option<TaskStatus>, Query, description = "Filter by status"),
        ("usuarioId" = Option<Uuid>, Query, description = "Filter by assignee"),
        ("sprintId" = Option<Uuid>, Query, description = "Filter by sprint"),
        ("busqueda" = Option<String>, Query, description = "Match on title or description"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated visible tasks (`data` + `pagination`)", body = Vec<TaskResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/tareas")]
pub async fn list_tasks(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    filters: web::Query<TaskListQuery>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (tasks, total) = pool.list_tasks(&auth.user, &filters, &page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: pool.task_responses(tasks).await?,
        pagination: page.paginate(total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/tareas/{id}",
    tag = "Tasks",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task with tags", body = TaskResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/tareas/{id}")]
pub async fn get_task(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let access = resolve_task(&pool, auth.user.id, path.into_inner()).await?;
    ensure_project_visible(&pool, &auth.user, &access.project).await?;
    Ok(HttpResponse::Ok().json(pool.task_response(access.task).await?))
}

#[utoipa::path(
    post,
    path = "/api/tareas",
    tag = "Tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project, sprint or assignee not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/tareas")]
pub async fn create_task(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateTaskRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let actor = auth.user;

    let project = pool.get_project(body.project_id).await?;
    ensure_project_visible(&pool, &actor, &project).await?;
    check_planning_refs(&pool, &project, body.sprint_id, body.release_id).await?;
    pool.ensure_tags_exist(&body.tag_ids).await?;
    let assignment = assignment_for(&pool, body.assignee_id).await?;

    let body = body.into_inner();
    let task = pool
        .insert_task(NewTask {
            project_id: project.id,
            title: body.title,
            description: body.description,
            status: body.status.unwrap_or_default(),
            priority: body
                .priority
                .unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
            assignment,
            creator_id: actor.id,
            sprint_id: body.sprint_id,
            release_id: body.release_id,
            due_date: body.due_date,
        })
        .await?;

    for tag_id in &body.tag_ids {
        pool.attach_tag(task.id, *tag_id).await?;
    }

    info!(task_id = %task.id, project_id = %project.id, "Task created");
    outbox.record(NewActivity::new(
        ActivityAction::Create,
        task_ref(task.id),
        actor.id,
        &task.title,
        "creada",
    ));
    if let Some(assignee_id) = task.assignee_id {
        if let Some(draft) = NotificationDraft::task_assigned(actor.id, assignee_id, &task) {
            outbox.notify(draft);
        }
    }

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Tarea creada",
        pool.task_response(task).await?,
    )))
}

#[utoipa::path(
    put,
    path = "/api/tareas/{id}",
    tag = "Tasks",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/tareas/{id}")]
pub async fn update_task(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateTaskRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let actor = auth.user;
    let access = resolve_task(&pool, actor.id, path.into_inner()).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    let existing = access.task;
    check_planning_refs(
        &pool,
        &access.project,
        body.sprint_id.flatten(),
        body.release_id.flatten(),
    )
    .await?;
    let assignment = match body.assignee_id {
        Some(user_id) => Some(assignment_for(&pool, user_id).await?),
        None => None,
    };

    let before = snapshot(&TaskResponse::new(existing.clone(), Vec::new()));
    let old_status = status_of(&existing);
    let old_assignee = existing.assignee_id;

    let mut active: task::ActiveModel = existing.into();
    if let Some(title) = &body.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = &body.description {
        active.description = Set(description.clone());
    }
    if let Some(status) = body.status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(priority) = &body.priority {
        active.priority = Set(priority.clone());
    }
    if let Some(sprint_id) = body.sprint_id {
        active.sprint_id = Set(sprint_id);
    }
    if let Some(release_id) = body.release_id {
        active.release_id = Set(release_id);
    }
    if let Some(due_date) = body.due_date {
        active.due_date = Set(due_date);
    }
    if let Some(assignment) = assignment {
        assignment.apply(&mut active);
    }
    let updated = pool.save_task(active).await?;

    let after = snapshot(&TaskResponse::new(updated.clone(), Vec::new()));
    let changes = compute_changes(&before, &after, &body.submitted_fields());
    debug!(task_id = %updated.id, changes = changes.len(), "Task updated");
    outbox.record_activity(NewActivity::for_changes(
        task_ref(updated.id),
        actor.id,
        &updated.title,
        changes,
    ));

    if let Some(assignee_id) = updated.assignee_id.filter(|id| Some(*id) != old_assignee) {
        if let Some(draft) = NotificationDraft::task_assigned(actor.id, assignee_id, &updated) {
            outbox.notify(draft);
        }
    }
    let new_status = status_of(&updated);
    if new_status != old_status {
        if let Some(draft) = NotificationDraft::task_status_changed(actor.id, &updated, new_status)
        {
            outbox.notify(draft);
        }
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Tarea actualizada",
        pool.task_response(updated).await?,
    )))
}

/// Any status may follow any other.
#[utoipa::path(
    patch,
    path = "/api/tareas/{id}/estado",
    tag = "Tasks",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = TaskResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[patch("/tareas/{id}/estado")]
pub async fn change_status(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ChangeStatusRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.user;
    let access = resolve_task(&pool, actor.id, path.into_inner()).await?;
    require(
        access.permissions.can_change_status(),
        "No tienes permiso para cambiar el estado de esta tarea",
    )?;

    let old_status = status_of(&access.task);
    let new_status = body.status;
    let mut active: task::ActiveModel = access.task.into();
    active.status = Set(new_status.as_str().to_string());
    let updated = pool.save_task(active).await?;

    if new_status != old_status {
        let verb = format!("cambió a {}", new_status);
        outbox.record(
            NewActivity::new(
                ActivityAction::ChangeStatus,
                task_ref(updated.id),
                actor.id,
                &updated.title,
                &verb,
            )
            .with_change(FieldChange {
                field: "estado".to_string(),
                old_value: Some(old_status.as_str().to_string()),
                new_value: Some(new_status.as_str().to_string()),
            }),
        );
        if let Some(draft) = NotificationDraft::task_status_changed(actor.id, &updated, new_status)
        {
            outbox.notify(draft);
        }
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Estado actualizado",
        pool.task_response(updated).await?,
    )))
}

/// Self-assignment is always allowed; the current assignee may also drop
/// the task. Anything else needs edit rights.
#[utoipa::path(
    patch,
    path = "/api/tareas/{id}/asignar",
    tag = "Tasks",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = AssignTaskRequest,
    responses(
        (status = 200, description = "Task assigned", body = TaskResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task or user not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[patch("/tareas/{id}/asignar")]
pub async fn assign_task(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<AssignTaskRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.user;
    let access = resolve_task(&pool, actor.id, path.into_inner()).await?;

    let allowed = match body.assignee_id {
        Some(target) => can_self_assign(actor.id, target) || access.permissions.can_edit(),
        None => access.permissions.is_assignee || access.permissions.can_edit(),
    };
    require(allowed, "No tienes permiso para asignar esta tarea")?;

    let assignment = assignment_for(&pool, body.assignee_id).await?;
    let old_name = access.task.assignee_name.clone();
    let old_assignee = access.task.assignee_id;

    let mut active: task::ActiveModel = access.task.into();
    assignment.apply(&mut active);
    let updated = pool.save_task(active).await?;

    if updated.assignee_id != old_assignee {
        let verb = match &updated.assignee_name {
            Some(name) => format!("asignada a {}", name),
            None => "desasignada".to_string(),
        };
        outbox.record(
            NewActivity::new(
                ActivityAction::Assign,
                task_ref(updated.id),
                actor.id,
                &updated.title,
                &verb,
            )
            .with_change(FieldChange {
                field: "usuarioId".to_string(),
                old_value: old_name,
                new_value: updated.assignee_name.clone(),
            }),
        );
    }
    if let Some(assignee_id) = updated.assignee_id.filter(|id| Some(*id) != old_assignee) {
        if let Some(draft) = NotificationDraft::task_assigned(actor.id, assignee_id, &updated) {
            outbox.notify(draft);
        }
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Tarea asignada",
        pool.task_response(updated).await?,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/tareas/{id}",
    tag = "Tasks",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/tareas/{id}")]
pub async fn delete_task(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    storage: web::Data<LocalStorage>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = auth.user;
    let access = resolve_task(&pool, actor.id, path.into_inner()).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;
    let task = access.task;

    let stored_names = pool.stored_names_for_task(task.id).await?;
    pool.delete_task(task.id).await?;
    for name in &stored_names {
        storage.remove(name).await;
    }

    info!(task_id = %task.id, deleted_by = %actor.id, "Task deleted");
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        task_ref(task.id),
        actor.id,
        &task.title,
        "eliminada",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Tarea eliminada" })))
}

#[utoipa::path(
    post,
    path = "/api/tareas/{id}/etiquetas/{etiqueta_id}",
    tag = "Tasks",
    params(
        ("id" = Uuid, Path, description = "Task ID"),
        ("etiqueta_id" = Uuid, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag attached", body = TaskResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task or tag not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Tag already attached", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/tareas/{id}/etiquetas/{etiqueta_id}")]
pub async fn attach_tag(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (task_id, tag_id) = path.into_inner();
    let access = resolve_task(&pool, auth.user.id, task_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;
    pool.get_tag(tag_id).await?;

    if !pool.attach_tag(task_id, tag_id).await? {
        return Err(AppError::Conflict(
            "La etiqueta ya está asignada a la tarea".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Etiqueta agregada",
        pool.task_response(access.task).await?,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/tareas/{id}/etiquetas/{etiqueta_id}",
    tag = "Tasks",
    params(
        ("id" = Uuid, Path, description = "Task ID"),
        ("etiqueta_id" = Uuid, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag detached", body = TaskResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task or tag not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/tareas/{id}/etiquetas/{etiqueta_id}")]
pub async fn detach_tag(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (task_id, tag_id) = path.into_inner();
    let access = resolve_task(&pool, auth.user.id, task_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    if !pool.detach_tag(task_id, tag_id).await? {
        return Err(AppError::NotFound("Etiqueta".to_string()));
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Etiqueta quitada",
        pool.task_response(access.task).await?,
    )))
}
