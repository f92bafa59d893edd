//! SeaORM entity definitions for PostgreSQL database.

pub mod activity_log;
pub mod attachment;
pub mod comment;
pub mod github_token;
pub mod issue;
pub mod notification;
pub mod project;
pub mod project_member;
pub mod refresh_token;
pub mod release;
pub mod repository;
pub mod sprint;
pub mod tag;
pub mod task;
pub mod task_tag;
pub mod user;
