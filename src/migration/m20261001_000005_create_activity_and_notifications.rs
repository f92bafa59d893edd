//! Migration: Create activity_logs and notifications tables.
//!
//! Both reference other rows through `(entity, id)` pairs or nullable ids
//! without foreign keys, so entries survive deletion of their subject.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE activity_logs (
                    id UUID PRIMARY KEY,
                    action VARCHAR(30) NOT NULL,
                    entity VARCHAR(30) NOT NULL,
                    entity_id UUID NOT NULL,
                    field VARCHAR(60),
                    old_value TEXT,
                    new_value TEXT,
                    description TEXT NOT NULL,
                    user_id UUID NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_activity_logs_entity ON activity_logs(entity, entity_id);
                CREATE INDEX idx_activity_logs_created_at ON activity_logs(created_at);

                CREATE TABLE notifications (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    kind VARCHAR(30) NOT NULL,
                    title VARCHAR(255) NOT NULL,
                    description TEXT NOT NULL,
                    read BOOLEAN NOT NULL DEFAULT FALSE,
                    task_id UUID,
                    project_id UUID,
                    issue_id UUID,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_notifications_user_unread
                    ON notifications(user_id, created_at DESC)
                    WHERE read = FALSE;
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TABLE IF EXISTS notifications CASCADE;
                DROP TABLE IF EXISTS activity_logs CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
