//! User directory and account management.

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, AdminUser, AuthUser};
use crate::db::users::{NewUser, UserChanges};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::user::{CreateUserRequest, UpdateUserRequest, UserListQuery, UserResponse};
use crate::models::{
    ActivityAction, EntityKind, EntityRef, MessageResponse, NewActivity, Paginated,
    PaginationParams, Role,
};
use crate::services::activity::{compute_changes, snapshot};
use crate::services::Outbox;

/// Configure user routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(get_user)
        .service(create_user)
        .service(update_user)
        .service(delete_user);
}

#[utoipa::path(
    get,
    path = "/api/usuarios",
    tag = "Users",
    params(
        ("busqueda" = Option<String>, Query, description = "Match on name or email"),
        ("rol" = Option<Role>, Query, description = "Filter by role"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Results per page (max 100)")
    ),
    responses(
        (status = 200, description = "Paginated users (`data` + `pagination`)", body = Vec<UserResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/usuarios")]
pub async fn list_users(
    pool: web::Data<DbPool>,
    _auth: AuthUser,
    filters: web::Query<UserListQuery>,
    page: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (users, total) = pool.list_users(&filters, &page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
        pagination: page.paginate(total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/usuarios/{id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/usuarios/{id}")]
pub async fn get_user(
    pool: web::Data<DbPool>,
    _auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let user = pool.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Administrators create anyone; project owners and managers may add
/// employees so they can staff their projects.
#[utoipa::path(
    post,
    path = "/api/usuarios",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/usuarios")]
pub async fn create_user(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateUserRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let actor = auth.user;
    let role = body.role.unwrap_or_default();

    if !actor.is_admin() {
        if role == Role::Administrator {
            return Err(AppError::Forbidden(
                "Solo un administrador puede crear administradores".to_string(),
            ));
        }
        if !pool.owns_or_manages_any_project(actor.id).await? {
            return Err(AppError::Forbidden(
                "No tienes permiso para crear usuarios".to_string(),
            ));
        }
    }

    if pool.find_user_by_email(&body.email).await?.is_some() {
        return Err(AppError::Conflict("El email ya está registrado".to_string()));
    }

    let user = pool
        .insert_user(NewUser {
            name: &body.name,
            email: &body.email,
            password_hash: hash_password(&body.password)?,
            role,
        })
        .await?;

    info!(user_id = %user.id, created_by = %actor.id, role = %role, "User created");
    outbox.record(NewActivity::new(
        ActivityAction::Create,
        EntityRef::new(EntityKind::User, user.id),
        actor.id,
        &user.name,
        "creado",
    ));

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Usuario creado",
        UserResponse::from(user),
    )))
}

#[utoipa::path(
    put,
    path = "/api/usuarios/{id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/usuarios/{id}")]
pub async fn update_user(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let actor = auth.user;
    let id = path.into_inner();

    if !actor.is_admin() && actor.id != id {
        return Err(AppError::Forbidden(
            "Solo puedes modificar tu propio perfil".to_string(),
        ));
    }
    if body.role.is_some() && !actor.is_admin() {
        return Err(AppError::Forbidden(
            "Solo un administrador puede cambiar roles".to_string(),
        ));
    }

    let existing = pool.get_user(id).await?;
    if let Some(email) = body.email.as_deref() {
        if let Some(other) = pool.find_user_by_email(email).await? {
            if other.id != id {
                return Err(AppError::Conflict("El email ya está registrado".to_string()));
            }
        }
    }

    let password_hash = body.password.as_deref().map(hash_password).transpose()?;
    let password_changed = password_hash.is_some();
    let updated = pool
        .update_user(
            id,
            UserChanges {
                name: body.name.clone(),
                email: body.email.clone(),
                password_hash,
                role: body.role,
            },
        )
        .await?;

    if password_changed {
        pool.revoke_user_refresh_tokens(id).await?;
    }

    let before = snapshot(&UserResponse::from(existing));
    let after = snapshot(&UserResponse::from(updated.clone()));
    let submitted: Vec<&str> = [
        body.name.as_ref().map(|_| "nombre"),
        body.email.as_ref().map(|_| "email"),
        body.role.as_ref().map(|_| "rol"),
    ]
    .into_iter()
    .flatten()
    .collect();
    let changes = compute_changes(&before, &after, &submitted);
    outbox.record_activity(NewActivity::for_changes(
        EntityRef::new(EntityKind::User, id),
        actor.id,
        &updated.name,
        changes,
    ));

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Usuario actualizado",
        UserResponse::from(updated),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/usuarios/{id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Administrators cannot delete themselves", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "User created or manages a project", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/usuarios/{id}")]
pub async fn delete_user(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if admin.user.id == id {
        return Err(AppError::InvalidInput(
            "No puedes eliminar tu propia cuenta".to_string(),
        ));
    }

    let user = pool.get_user(id).await?;
    if pool.owns_or_manages_any_project(id).await? {
        return Err(AppError::Conflict(
            "El usuario es creador o responsable de algún proyecto".to_string(),
        ));
    }

    pool.delete_user(id).await?;
    info!(user_id = %id, deleted_by = %admin.user.id, "User deleted");
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        EntityRef::new(EntityKind::User, id),
        admin.user.id,
        &user.name,
        "eliminado",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Usuario eliminado" })))
}
