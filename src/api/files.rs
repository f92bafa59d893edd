//! Task attachments: multipart upload, listing and download.

use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::http::header::{
    self, ContentDisposition, DispositionParam, DispositionType, HeaderName, HeaderValue,
};
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::attachments::NewAttachment;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::attachment::{AttachmentList, AttachmentResponse};
use crate::models::{ActivityAction, EntityKind, EntityRef, MessageResponse, NewActivity};
use crate::services::permissions::{ensure_project_visible, require, resolve_task};
use crate::services::{LocalStorage, Outbox};

/// Configure attachment routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_file)
        .service(list_task_files)
        .service(download_file)
        .service(get_file)
        .service(delete_file);
}

fn attachment_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Attachment, id)
}

/// Store the first file part of the form. Limits are checked while
/// streaming; a rejected file never reaches the database.
#[utoipa::path(
    post,
    path = "/api/archivos/tarea/{tarea_id}",
    tag = "Files",
    params(
        ("tarea_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 201, description = "Attachment stored", body = AttachmentResponse),
        (status = 400, description = "Missing file or malformed multipart body", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse),
        (status = 413, description = "File or task attachment total over the size limit", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/archivos/tarea/{tarea_id}")]
pub async fn upload_file(
    pool: web::Data<DbPool>,
    storage: web::Data<LocalStorage>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let actor = auth.user;
    let access = resolve_task(&pool, actor.id, path.into_inner()).await?;
    ensure_project_visible(&pool, &actor, &access.project).await?;
    let task = access.task;

    let used = pool.task_attachments_size(task.id).await?.max(0) as u64;

    while let Some(item) = payload.next().await {
        let field = item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let Some(filename) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
        else {
            continue;
        };
        let content_type = field.content_type().map(|m| m.to_string());

        let stored = storage
            .save_stream(&filename, content_type.as_deref(), field, used)
            .await?;

        let inserted = pool
            .insert_attachment(NewAttachment {
                task_id: task.id,
                uploaded_by: actor.id,
                original_name: stored.original_name.clone(),
                stored_name: stored.stored_name.clone(),
                mime_type: stored.mime_type.clone(),
                size_bytes: stored.size as i64,
            })
            .await;
        let attachment = match inserted {
            Ok(attachment) => attachment,
            Err(e) => {
                storage.remove(&stored.stored_name).await;
                return Err(e);
            }
        };

        info!(
            task_id = %task.id,
            attachment_id = %attachment.id,
            size = stored.size,
            "File uploaded"
        );
        outbox.record(NewActivity::new(
            ActivityAction::Upload,
            attachment_ref(attachment.id),
            actor.id,
            &attachment.original_name,
            &format!("subido a la tarea \"{}\"", task.title),
        ));

        return Ok(HttpResponse::Created().json(MessageResponse::new(
            "Archivo subido",
            AttachmentResponse::from(attachment),
        )));
    }

    Err(AppError::InvalidInput(
        "No se recibió ningún archivo".to_string(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/archivos/tarea/{tarea_id}",
    tag = "Files",
    params(
        ("tarea_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task attachments", body = AttachmentList),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/archivos/tarea/{tarea_id}")]
pub async fn list_task_files(
    pool: web::Data<DbPool>,
    storage: web::Data<LocalStorage>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let access = resolve_task(&pool, auth.user.id, path.into_inner()).await?;
    ensure_project_visible(&pool, &auth.user, &access.project).await?;

    let files = pool.list_attachments(access.task.id).await?;
    let total_size = files.iter().map(|f| f.size_bytes).sum();
    Ok(HttpResponse::Ok().json(AttachmentList {
        files: files.into_iter().map(AttachmentResponse::from).collect(),
        total_size,
        max_total_size: storage.max_task_total_size(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/archivos/{id}",
    tag = "Files",
    params(
        ("id" = Uuid, Path, description = "Attachment ID")
    ),
    responses(
        (status = 200, description = "Attachment metadata", body = AttachmentResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Attachment not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/archivos/{id}")]
pub async fn get_file(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let attachment = pool.get_attachment(path.into_inner()).await?;
    let access = resolve_task(&pool, auth.user.id, attachment.task_id).await?;
    ensure_project_visible(&pool, &auth.user, &access.project).await?;
    Ok(HttpResponse::Ok().json(AttachmentResponse::from(attachment)))
}

/// Uploader, administrators and task editors may delete.
#[utoipa::path(
    delete,
    path = "/api/archivos/{id}",
    tag = "Files",
    params(
        ("id" = Uuid, Path, description = "Attachment ID")
    ),
    responses(
        (status = 200, description = "Attachment deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Attachment not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/archivos/{id}")]
pub async fn delete_file(
    pool: web::Data<DbPool>,
    storage: web::Data<LocalStorage>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = auth.user;
    let attachment = pool.get_attachment(path.into_inner()).await?;
    let access = resolve_task(&pool, actor.id, attachment.task_id).await?;
    require(
        attachment.uploaded_by == actor.id || access.permissions.can_edit(),
        "No tienes permiso para eliminar este archivo",
    )?;

    pool.delete_attachment(attachment.id).await?;
    storage.remove(&attachment.stored_name).await;

    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        attachment_ref(attachment.id),
        actor.id,
        &attachment.original_name,
        "eliminado",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Archivo eliminado" })))
}

/// Serve a stored file. Stored names are random, so the link itself is the
/// capability; `<img>` tags cannot send bearer tokens.
#[utoipa::path(
    get,
    path = "/api/archivos/descargar/{nombre}",
    tag = "Files",
    params(
        ("nombre" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = crate::error::ErrorResponse),
    )
)]
#[get("/archivos/descargar/{nombre}")]
pub async fn download_file(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    storage: web::Data<LocalStorage>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let stored_name = path.into_inner();
    let file_path = storage.resolve(&stored_name)?;
    let attachment = pool
        .find_attachment_by_stored_name(&stored_name)
        .await?
        .ok_or_else(|| AppError::NotFound("Archivo".to_string()))?;

    let file = NamedFile::open_async(&file_path).await.map_err(|e| {
        debug!(file = %stored_name, error = %e, "Stored file missing");
        AppError::NotFound("Archivo".to_string())
    })?;
    let file = file.set_content_disposition(ContentDisposition {
        disposition: DispositionType::Inline,
        parameters: vec![DispositionParam::Filename(attachment.original_name)],
    });

    let mut response = file.into_response(&req);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(LocalStorage::content_type_for(&stored_name)),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("cross-origin"),
    );
    Ok(response)
}
