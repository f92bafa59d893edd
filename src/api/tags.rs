//! Global tag catalogue.

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::tag::{CreateTagRequest, TagResponse, UpdateTagRequest, DEFAULT_TAG_COLOR};
use crate::models::{
    ActivityAction, EntityKind, EntityRef, MessageResponse, NewActivity, Paginated,
    PaginationParams,
};
use crate::services::activity::{compute_changes, snapshot};
use crate::services::permissions::require;
use crate::services::Outbox;

/// Configure tag routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_tags)
        .service(create_tag)
        .service(update_tag)
        .service(delete_tag);
}

fn tag_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Tag, id)
}

#[utoipa::path(
    get,
    path = "/api/etiquetas",
    tag = "Tags",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated tags (`data` + `pagination`)", body = Vec<TagResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/etiquetas")]
pub async fn list_tags(
    pool: web::Data<DbPool>,
    _auth: AuthUser,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (tags, total) = pool.list_tags(&page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: tags.into_iter().map(TagResponse::from).collect::<Vec<_>>(),
        pagination: page.paginate(total),
    }))
}

/// Duplicate names surface as 409 through the unique index.
#[utoipa::path(
    post,
    path = "/api/etiquetas",
    tag = "Tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 409, description = "Tag name already exists", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/etiquetas")]
pub async fn create_tag(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateTagRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let color = body.color.as_deref().unwrap_or(DEFAULT_TAG_COLOR);
    let tag = pool.insert_tag(&body.name, color, auth.user.id).await?;

    outbox.record(NewActivity::new(
        ActivityAction::Create,
        tag_ref(tag.id),
        auth.user.id,
        &tag.name,
        "creada",
    ));

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Etiqueta creada",
        TagResponse::from(tag),
    )))
}

#[utoipa::path(
    put,
    path = "/api/etiquetas/{id}",
    tag = "Tags",
    params(
        ("id" = Uuid, Path, description = "Tag ID")
    ),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag updated", body = TagResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Tag not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Tag name already exists", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/etiquetas/{id}")]
pub async fn update_tag(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateTagRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let existing = pool.get_tag(path.into_inner()).await?;
    require(
        auth.user.is_admin() || existing.created_by == auth.user.id,
        "Solo el creador o un administrador puede modificar la etiqueta",
    )?;

    let before = snapshot(&TagResponse::from(existing.clone()));
    let updated = pool.update_tag(existing, &body).await?;
    let after = snapshot(&TagResponse::from(updated.clone()));

    let submitted: Vec<&str> = [
        body.name.as_ref().map(|_| "nombre"),
        body.color.as_ref().map(|_| "color"),
    ]
    .into_iter()
    .flatten()
    .collect();
    outbox.record_activity(NewActivity::for_changes(
        tag_ref(updated.id),
        auth.user.id,
        &updated.name,
        compute_changes(&before, &after, &submitted),
    ));

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Etiqueta actualizada",
        TagResponse::from(updated),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/etiquetas/{id}",
    tag = "Tags",
    params(
        ("id" = Uuid, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Tag not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/etiquetas/{id}")]
pub async fn delete_tag(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let tag = pool.get_tag(path.into_inner()).await?;
    require(
        auth.user.is_admin() || tag.created_by == auth.user.id,
        "Solo el creador o un administrador puede eliminar la etiqueta",
    )?;

    pool.delete_tag(tag.id).await?;
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        tag_ref(tag.id),
        auth.user.id,
        &tag.name,
        "eliminada",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Etiqueta eliminada" })))
}
