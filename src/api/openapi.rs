//! OpenAPI documentation configuration.

use actix_web::{get, HttpResponse};
use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tablero API",
        version = "0.1.0",
        description = "Kanban project and task tracking: projects, tasks, sprints, releases, comments, attachments, GitHub commits and notifications"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Auth endpoints
        api::auth::login,
        api::auth::refresh,
        api::auth::logout,
        api::auth::me,
        api::auth::forgot_password,
        api::auth::reset_password,
        // User endpoints
        api::users::list_users,
        api::users::get_user,
        api::users::create_user,
        api::users::update_user,
        api::users::delete_user,
        // Project endpoints
        api::projects::list_projects,
        api::projects::get_project,
        api::projects::create_project,
        api::projects::update_project,
        api::projects::delete_project,
        api::projects::list_members,
        api::projects::add_member,
        api::projects::remove_member,
        // Task endpoints
        api::tasks::list_tasks,
        api::tasks::get_task,
        api::tasks::create_task,
        api::tasks::update_task,
        api::tasks::change_status,
        api::tasks::assign_task,
        api::tasks::delete_task,
        api::tasks::attach_tag,
        api::tasks::detach_tag,
        // Sprint endpoints
        api::sprints::list_sprints,
        api::sprints::get_sprint,
        api::sprints::create_sprint,
        api::sprints::update_sprint,
        api::sprints::delete_sprint,
        // Release endpoints
        api::releases::list_releases,
        api::releases::get_release,
        api::releases::create_release,
        api::releases::update_release,
        api::releases::delete_release,
        // Comment endpoints
        api::comments::list_task_comments,
        api::comments::create_comment,
        api::comments::update_comment,
        api::comments::delete_comment,
        // Tag endpoints
        api::tags::list_tags,
        api::tags::create_tag,
        api::tags::update_tag,
        api::tags::delete_tag,
        // File endpoints
        api::files::upload_file,
        api::files::list_task_files,
        api::files::get_file,
        api::files::delete_file,
        api::files::download_file,
        // GitHub endpoints
        api::github::save_token,
        api::github::token_status,
        api::github::delete_token,
        api::github::list_project_repositories,
        api::github::project_commits,
        api::github::sync_repository,
        api::github::get_repository,
        api::github::create_repository,
        api::github::update_repository,
        api::github::delete_repository,
        // Issue endpoints
        api::issues::list_issues,
        api::issues::create_issue,
        api::issues::update_issue_status,
        api::issues::delete_issue,
        // Notification endpoints
        api::notifications::list_notifications,
        api::notifications::unread_count,
        api::notifications::mark_all_read,
        api::notifications::mark_read,
        api::notifications::delete_notification,
        // Activity endpoints
        api::activities::list_activities,
        api::activities::entity_history,
        // Statistics endpoints
        api::stats::dashboard,
        api::stats::project_stats,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            error::FieldError,
            models::Pagination,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Auth and users
            models::Role,
            models::user::LoginRequest,
            models::user::TokenPair,
            models::user::RefreshRequest,
            models::user::ForgotPasswordRequest,
            models::user::ResetPasswordRequest,
            models::user::UserResponse,
            models::user::CreateUserRequest,
            models::user::UpdateUserRequest,
            // Projects
            models::project::ProjectResponse,
            models::project::CreateProjectRequest,
            models::project::UpdateProjectRequest,
            models::project::AddMemberRequest,
            models::project::MemberResponse,
            // Tasks
            models::task::TaskStatus,
            models::task::TaskResponse,
            models::task::CreateTaskRequest,
            models::task::UpdateTaskRequest,
            models::task::ChangeStatusRequest,
            models::task::AssignTaskRequest,
            // Sprints and releases
            models::sprint::SprintResponse,
            models::sprint::CreateSprintRequest,
            models::sprint::UpdateSprintRequest,
            models::release::ReleaseStatus,
            models::release::ReleaseResponse,
            models::release::CreateReleaseRequest,
            models::release::UpdateReleaseRequest,
            // Comments, tags and files
            models::comment::CommentResponse,
            models::comment::CreateCommentRequest,
            models::comment::UpdateCommentRequest,
            models::tag::TagResponse,
            models::tag::CreateTagRequest,
            models::tag::UpdateTagRequest,
            models::attachment::AttachmentResponse,
            models::attachment::AttachmentList,
            // GitHub
            models::github::SaveTokenRequest,
            models::github::TokenStatusResponse,
            models::github::RepositoryResponse,
            models::github::CreateRepositoryRequest,
            models::github::UpdateRepositoryRequest,
            models::github::CommitSummary,
            models::github::CommitsResponse,
            models::github::SyncResponse,
            // Issues and notifications
            models::issue::IssueKind,
            models::issue::IssueStatus,
            models::issue::IssueResponse,
            models::issue::CreateIssueRequest,
            models::issue::UpdateIssueStatusRequest,
            models::notification::NotificationKind,
            models::notification::NotificationResponse,
            models::notification::UnreadCountResponse,
            // Activity and statistics
            models::activity::ActivityAction,
            models::activity::EntityKind,
            models::activity::FieldChange,
            models::activity::ActivityResponse,
            models::stats::StatusCounts,
            models::stats::AssigneeLoad,
            models::stats::DashboardStats,
            models::stats::ProjectStats,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Login, token refresh and password reset"),
        (name = "Users", description = "User administration"),
        (name = "Projects", description = "Projects and their members"),
        (name = "Tasks", description = "Kanban tasks"),
        (name = "Sprints", description = "Project sprints"),
        (name = "Releases", description = "Project releases"),
        (name = "Comments", description = "Task comments"),
        (name = "Tags", description = "Global tags"),
        (name = "Files", description = "Task attachments"),
        (name = "GitHub", description = "Linked repositories, tokens and commits"),
        (name = "Issues", description = "Bug reports and suggestions"),
        (name = "Notifications", description = "Per-user notifications"),
        (name = "Activities", description = "Activity log"),
        (name = "Statistics", description = "Dashboard statistics")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add bearer JWT security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the generated OpenAPI document.
#[get("/openapi.json")]
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/tareas/{id}"));
        assert!(doc.paths.paths.contains_key("/health"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("TaskResponse"));
    }
}
