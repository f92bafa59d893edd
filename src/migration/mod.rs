//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_projects;
mod m20261001_000003_create_tasks;
mod m20261001_000004_create_issues_and_github;
mod m20261001_000005_create_activity_and_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_projects::Migration),
            Box::new(m20261001_000003_create_tasks::Migration),
            Box::new(m20261001_000004_create_issues_and_github::Migration),
            Box::new(m20261001_000005_create_activity_and_notifications::Migration),
        ]
    }
}
