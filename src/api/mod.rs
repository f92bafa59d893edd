//! API endpoint modules.

pub mod activities;
pub mod auth;
pub mod comments;
pub mod files;
pub mod github;
pub mod health;
pub mod issues;
pub mod notifications;
pub mod openapi;
pub mod projects;
pub mod releases;
pub mod sprints;
pub mod stats;
pub mod tags;
pub mod tasks;
pub mod users;

use actix_web::web;

pub use activities::configure_routes as configure_activity_routes;
pub use auth::configure_routes as configure_auth_routes;
pub use comments::configure_routes as configure_comment_routes;
pub use files::configure_routes as configure_file_routes;
pub use github::configure_routes as configure_github_routes;
pub use health::{configure_health_routes, StartedAt};
pub use issues::configure_routes as configure_issue_routes;
pub use notifications::configure_routes as configure_notification_routes;
pub use openapi::ApiDoc;
pub use projects::configure_routes as configure_project_routes;
pub use releases::configure_routes as configure_release_routes;
pub use sprints::configure_routes as configure_sprint_routes;
pub use stats::configure_routes as configure_stats_routes;
pub use tags::configure_routes as configure_tag_routes;
pub use tasks::configure_routes as configure_task_routes;
pub use users::configure_routes as configure_user_routes;

/// Mount every resource family; the caller picks the scope.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(openapi::openapi_json)
        .configure(configure_auth_routes)
        .configure(configure_user_routes)
        .configure(configure_project_routes)
        .configure(configure_task_routes)
        .configure(configure_sprint_routes)
        .configure(configure_release_routes)
        .configure(configure_comment_routes)
        .configure(configure_tag_routes)
        .configure(configure_file_routes)
        .configure(configure_github_routes)
        .configure(configure_issue_routes)
        .configure(configure_notification_routes)
        .configure(configure_activity_routes)
        .configure(configure_stats_routes);
}
