//! GitHub integration: per-project tokens, linked repositories and commits.

use actix_web::{delete, get, post, put, web, HttpResponse};
use futures_util::future::join_all;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::config::Config;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::github::{
    CommitsResponse, CreateRepositoryRequest, RepositoryFailure, RepositoryResponse,
    SaveTokenRequest, SyncResponse, TokenStatusResponse, UpdateRepositoryRequest,
};
use crate::models::{
    ActivityAction, EntityKind, EntityRef, MessageResponse, NewActivity, NotificationDraft,
};
use crate::services::activity::{compute_changes, snapshot};
use crate::services::github::{commits_since, merge_commits};
use crate::services::permissions::{ensure_project_visible, require, resolve_project};
use crate::services::{GitHubClient, Outbox};

const EDIT_DENIED: &str = "No tienes permiso para gestionar la integración con GitHub";

/// Configure GitHub routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(save_token)
        .service(token_status)
        .service(delete_token)
        .service(project_commits)
        .service(list_project_repositories)
        .service(sync_repository)
        .service(get_repository)
        .service(create_repository)
        .service(update_repository)
        .service(delete_repository);
}

fn repository_ref(id: Uuid) -> EntityRef {
    EntityRef::new(EntityKind::Repository, id)
}

#[utoipa::path(
    put,
    path = "/api/github/tokens/{proyecto_id}",
    tag = "GitHub",
    params(
        ("proyecto_id" = Uuid, Path, description = "Project ID")
    ),
    request_body = SaveTokenRequest,
    responses(
        (status = 200, description = "Token stored encrypted", body = TokenStatusResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/github/tokens/{proyecto_id}")]
pub async fn save_token(
    pool: web::Data<DbPool>,
    github: web::Data<GitHubClient>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<SaveTokenRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let access = resolve_project(&pool, auth.user.id, path.into_inner()).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    let encrypted = github.cipher().encrypt(body.token.trim())?;
    let stored = pool
        .upsert_github_token(access.project.id, encrypted, auth.user.id)
        .await?;

    info!(project_id = %access.project.id, "GitHub token saved");
    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Token guardado",
        TokenStatusResponse {
            project_id: stored.project_id,
            configured: true,
            updated_at: Some(stored.updated_at),
        },
    )))
}

#[utoipa::path(
    get,
    path = "/api/github/tokens/{proyecto_id}",
    tag = "GitHub",
    params(
        ("proyecto_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Whether a token is configured", body = TokenStatusResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/github/tokens/{proyecto_id}")]
pub async fn token_status(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let access = resolve_project(&pool, auth.user.id, path.into_inner()).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    let stored = pool.find_github_token(access.project.id).await?;
    Ok(HttpResponse::Ok().json(TokenStatusResponse {
        project_id: access.project.id,
        configured: stored.is_some(),
        updated_at: stored.map(|t| t.updated_at),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/github/tokens/{proyecto_id}",
    tag = "GitHub",
    params(
        ("proyecto_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Token removed"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project or token not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/github/tokens/{proyecto_id}")]
pub async fn delete_token(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let access = resolve_project(&pool, auth.user.id, path.into_inner()).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    if !pool.delete_github_token(access.project.id).await? {
        return Err(AppError::NotFound("Token".to_string()));
    }
    info!(project_id = %access.project.id, "GitHub token removed");
    Ok(HttpResponse::Ok().json(json!({ "message": "Token eliminado" })))
}

#[utoipa::path(
    get,
    path = "/api/repositorios/proyecto/{proyecto_id}",
    tag = "GitHub",
    params(
        ("proyecto_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Linked repositories", body = Vec<RepositoryResponse>),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/repositorios/proyecto/{proyecto_id}")]
pub async fn list_project_repositories(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = pool.get_project(path.into_inner()).await?;
    ensure_project_visible(&pool, &auth.user, &project).await?;

    let repositories: Vec<RepositoryResponse> = pool
        .list_repositories(project.id)
        .await?
        .into_iter()
        .map(RepositoryResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(repositories))
}

/// Latest commits across every linked repository. A failing repository is
/// skipped; the failures are only reported in development.
#[utoipa::path(
    get,
    path = "/api/repositorios/proyecto/{proyecto_id}/commits",
    tag = "GitHub",
    params(
        ("proyecto_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Recent commits across linked repositories", body = CommitsResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/repositorios/proyecto/{proyecto_id}/commits")]
pub async fn project_commits(
    pool: web::Data<DbPool>,
    github: web::Data<GitHubClient>,
    config: web::Data<Config>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = pool.get_project(path.into_inner()).await?;
    ensure_project_visible(&pool, &auth.user, &project).await?;

    let repositories = pool.list_repositories(project.id).await?;
    let token = github.token_for_project(&pool, project.id).await?;

    let listings = join_all(
        repositories
            .iter()
            .map(|repo| github.list_commits(repo, token.as_ref())),
    )
    .await;

    let mut commits = Vec::new();
    let mut failures = Vec::new();
    for (repo, listing) in repositories.iter().zip(listings) {
        match listing {
            Ok(list) => commits.extend(list),
            Err(e) => {
                warn!(repository = %format!("{}/{}", repo.owner, repo.name), error = %e, "Commit listing failed");
                failures.push(RepositoryFailure {
                    repository: format!("{}/{}", repo.owner, repo.name),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(HttpResponse::Ok().json(CommitsResponse {
        commits: merge_commits(commits),
        debug: (config.is_development() && !failures.is_empty()).then_some(failures),
    }))
}

/// Notify the project manager of every commit newer than the last one seen.
#[utoipa::path(
    post,
    path = "/api/repositorios/{id}/sincronizar",
    tag = "GitHub",
    params(
        ("id" = Uuid, Path, description = "Repository ID")
    ),
    responses(
        (status = 200, description = "New commits since the last sync", body = SyncResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Repository not found", body = crate::error::ErrorResponse),
        (status = 502, description = "GitHub request failed", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/repositorios/{id}/sincronizar")]
pub async fn sync_repository(
    pool: web::Data<DbPool>,
    github: web::Data<GitHubClient>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let repo = pool.get_repository(path.into_inner()).await?;
    let access = resolve_project(&pool, auth.user.id, repo.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;
    let project = access.project;

    let token = github.token_for_project(&pool, project.id).await?;
    let commits = github.list_commits(&repo, token.as_ref()).await?;
    let full_name = format!("{}/{}", repo.owner, repo.name);

    let new = commits_since(&commits, repo.last_commit_sha.as_deref());
    for commit in new.iter().rev() {
        outbox.notify(NotificationDraft::commit(
            project.manager_id,
            project.id,
            &full_name,
            &commit.sha,
            &commit.message,
            &commit.author,
        ));
    }

    let head = commits.first().map(|c| c.sha.clone());
    if let Some(sha) = head.as_deref() {
        if repo.last_commit_sha.as_deref() != Some(sha) {
            pool.set_last_commit_sha(repo.id, sha).await?;
        }
    }

    info!(repository = %full_name, new_commits = new.len(), "Repository synchronized");
    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Repositorio sincronizado",
        SyncResponse {
            new_commits: new.len(),
            last_commit_sha: head.or(repo.last_commit_sha),
        },
    )))
}

#[utoipa::path(
    get,
    path = "/api/repositorios/{id}",
    tag = "GitHub",
    params(
        ("id" = Uuid, Path, description = "Repository ID")
    ),
    responses(
        (status = 200, description = "Repository", body = RepositoryResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Repository not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[get("/repositorios/{id}")]
pub async fn get_repository(
    pool: web::Data<DbPool>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let repo = pool.get_repository(path.into_inner()).await?;
    let project = pool.get_project(repo.project_id).await?;
    ensure_project_visible(&pool, &auth.user, &project).await?;
    Ok(HttpResponse::Ok().json(RepositoryResponse::from(repo)))
}

#[utoipa::path(
    post,
    path = "/api/repositorios",
    tag = "GitHub",
    request_body = CreateRepositoryRequest,
    responses(
        (status = 201, description = "Repository linked", body = RepositoryResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[post("/repositorios")]
pub async fn create_repository(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    body: web::Json<CreateRepositoryRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let access = resolve_project(&pool, auth.user.id, body.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    let repo = pool
        .insert_repository(
            access.project.id,
            &body.owner,
            &body.name,
            body.branch.clone(),
        )
        .await?;

    outbox.record(NewActivity::new(
        ActivityAction::Create,
        repository_ref(repo.id),
        auth.user.id,
        &format!("{}/{}", repo.owner, repo.name),
        "vinculado",
    ));

    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Repositorio vinculado",
        RepositoryResponse::from(repo),
    )))
}

#[utoipa::path(
    put,
    path = "/api/repositorios/{id}",
    tag = "GitHub",
    params(
        ("id" = Uuid, Path, description = "Repository ID")
    ),
    request_body = UpdateRepositoryRequest,
    responses(
        (status = 200, description = "Repository updated", body = RepositoryResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Repository not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[put("/repositorios/{id}")]
pub async fn update_repository(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateRepositoryRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let existing = pool.get_repository(path.into_inner()).await?;
    let access = resolve_project(&pool, auth.user.id, existing.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    let before = snapshot(&RepositoryResponse::from(existing.clone()));
    let updated = pool.update_repository(existing, &body).await?;
    let after = snapshot(&RepositoryResponse::from(updated.clone()));

    outbox.record_activity(NewActivity::for_changes(
        repository_ref(updated.id),
        auth.user.id,
        &format!("{}/{}", updated.owner, updated.name),
        compute_changes(&before, &after, &body.submitted_fields()),
    ));

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Repositorio actualizado",
        RepositoryResponse::from(updated),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/repositorios/{id}",
    tag = "GitHub",
    params(
        ("id" = Uuid, Path, description = "Repository ID")
    ),
    responses(
        (status = 200, description = "Repository unlinked"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Repository not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
#[delete("/repositorios/{id}")]
pub async fn delete_repository(
    pool: web::Data<DbPool>,
    outbox: web::Data<Outbox>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let repo = pool.get_repository(path.into_inner()).await?;
    let access = resolve_project(&pool, auth.user.id, repo.project_id).await?;
    require(access.permissions.can_edit(), EDIT_DENIED)?;

    pool.delete_repository(repo.id).await?;
    outbox.record(NewActivity::new(
        ActivityAction::Delete,
        repository_ref(repo.id),
        auth.user.id,
        &format!("{}/{}", repo.owner, repo.name),
        "desvinculado",
    ));

    Ok(HttpResponse::Ok().json(json!({ "message": "Repositorio desvinculado" })))
}
