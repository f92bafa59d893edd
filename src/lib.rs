//! Tablero server library.
//!
//! Kanban-style project and task management: projects, tasks, sprints,
//! releases, comments, attachments, GitHub commit tracking, an activity log
//! and per-user notifications, served as a JSON API.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
