//! Task comments.

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entity::comment;
use crate::error::AppResult;
use crate::models::comment::{CommentResponse, CreateCommentRequest, UpdateCommentRequest};
use crate::models::{
    ActivityAction, EntityKind, EntityRef, FieldChange, MessageResponse, NewActivity, Paginated,
    PaginationParams,
};
use crate::services::permissions::{ensure_project_visible, require, resolve_task};
use crate::services::Outbox;

/// Descriptions quote the start of the comment.
const EXCERPT_CHARS: usize = 50;

/// Configure comment routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_task_comments)
        .service(create_comment)
        .service(update_comment)
        .service(delete_comment);
}

fn comment_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Comment, id)
}

fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

async fn respond(pool: &DbPool, comment: comment::Model) -> AppResult<CommentResponse> {
    let author = pool.user_names(&[comment.author_id]).await?;
    let name = author.get(&comment.author_id).cloned();
    Ok(CommentResponse::new(comment, name))
}

#[utoipa::path(
    get,
    path = "/api/comentarios/tarea/{tarea_id}",
    tag = "Comments",
    params(
        ("tarea_id" = Uuid, Path, description = "Task ID"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated comments (`data` + `pagination`)", body = Vec<CommentResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/comentarios/tarea/{tarea_id}")]
pub async fn list_task_comments(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let access = resolve_task(&pool, auth.user.id, path.into_inner()).await?;
    ensure_project_visible(&pool, &auth.user, &access.project).await?;

    let (comments, total) = pool.list_comments(access.task.id, &page).await?;
    let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    author_ids.sort();
    author_ids.dedup();
    let names = pool.user_names(&author_ids).await?;

    Ok(HttpResponse::Ok().json(Paginated {
        data: comments
            .into_iter()
            .map(|c| {
                let name = names.get(&c.author_id).cloned();
                CommentResponse::new(c, name)
            })
            .collect::<Vec<_>>(),
        pagination: page.paginate(total),
    }))
}

#[utoipa::path(
    post,
    path = "/api/comentarios",
    tag = "Comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/comentarios")]
pub async fn create_comment(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let actor = auth.user;
    let access = resolve_task(&pool, actor.id, body.task_id).await?;
    ensure_project_visible(&pool, &actor, &access.project).await?;

    let comment = pool
        .insert_comment(access.task.id, actor.id, &body.content)
        .await?;

    outbox.record(NewActivity::new(
        ActivityAction::Comment,
        comment_ref(comment.id),
        actor.id,
        &excerpt(&comment.content),
        &format!("en la tarea \"{}\"", access.task.title),
    ));

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Comentario creado",
        respond(&pool, comment).await?,
    )))
}

/// Only the author may rewrite a comment.
#[utoipa::path(
    put,
    path = "/api/comentarios/{id}",
    tag = "Comments",
    params(
        ("id" = Uuid, Path, description = "Comment ID")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Only the author can edit", body = crate::error::ErrorResponse),
        (status = 404, description = "Comment not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/comentarios/{id}")]
pub async fn update_comment(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCommentRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let actor = auth.user;
    let existing = pool.get_comment(path.into_inner()).await?;
    require(
        existing.author_id == actor.id,
        "Solo el autor puede editar el comentario",
    )?;

    let old_content = existing.content.clone();
    let updated = pool.update_comment(existing, &body.content).await?;

    if updated.content != old_content {
        outbox.record(
            NewActivity::new(
                ActivityAction::Update,
                comment_ref(updated.id),
                actor.id,
                &excerpt(&updated.content),
                "actualizado: contenido",
            )
            .with_change(FieldChange {
                field: "contenido".to_string(),
                old_value: Some(old_content),
                new_value: Some(updated.content.clone()),
            }),
        );
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Comentario actualizado",
        respond(&pool, updated).await?,
    )))
}

/// Author, administrators and the task's project manager may delete.
#[utoipa::path(
    delete,
    path = "/api/comentarios/{id}",
    tag = "Comments",
    params(
        ("id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Comment not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/comentarios/{id}")]
pub async fn delete_comment(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = auth.user;
    let comment = pool.get_comment(path.into_inner()).await?;
    let access = resolve_task(&pool, actor.id, comment.task_id).await?;
    require(
        comment.author_id == actor.id
            || access.permissions.is_admin
            || access.permissions.is_manager,
        "No tienes permiso para eliminar este comentario",
    )?;

    pool.delete_comment(comment.id).await?;
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        comment_ref(comment.id),
        actor.id,
        &excerpt(&comment.content),
        "eliminado",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Comentario eliminado" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("corto"), "corto");
        let long = "á".repeat(60);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
    }
}
