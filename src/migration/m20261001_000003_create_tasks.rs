//! Migration: Create tasks, tags, task_tags, comments and attachments tables.

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
                CREATE TABLE tasks (
                    id UUID PRIMARY KEY,
                    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    title VARCHAR(255) NOT NULL,
                    description TEXT,
                    status VARCHAR(20) NOT NULL DEFAULT 'Pendiente'
                        CHECK (status IN ('Pendiente', 'EnProgreso', 'EnRevision', 'Completada')),
                    priority VARCHAR(30) NOT NULL DEFAULT 'Media',
                    assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
                    assignee_name VARCHAR(150),
                    creator_id UUID NOT NULL,
                    sprint_id UUID REFERENCES sprints(id) ON DELETE SET NULL,
                    release_id UUID REFERENCES releases(id) ON DELETE SET NULL,
                    due_date DATE,
                    is_placeholder BOOLEAN NOT NULL DEFAULT FALSE,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_tasks_project_id ON tasks(project_id);
                CREATE INDEX idx_tasks_assignee_id ON tasks(assignee_id);
                CREATE INDEX idx_tasks_status ON tasks(status) WHERE is_placeholder = FALSE;

                CREATE TRIGGER update_tasks_updated_at
                    BEFORE UPDATE ON tasks
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();

                CREATE TABLE tags (
                    id UUID PRIMARY KEY,
                    name VARCHAR(60) NOT NULL,
                    color VARCHAR(20) NOT NULL,
                    created_by UUID NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX idx_tags_name ON tags(LOWER(name));

                CREATE TABLE task_tags (
                    task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                    tag_id UUID NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                    PRIMARY KEY (task_id, tag_id)
                );

                CREATE TABLE comments (
                    id UUID PRIMARY KEY,
                    task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                    author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_comments_task_id ON comments(task_id);

                CREATE TRIGGER update_comments_updated_at
                    BEFORE UPDATE ON comments
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();

                CREATE TABLE attachments (
                    id UUID PRIMARY KEY,
                    task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                    uploaded_by UUID NOT NULL,
                    original_name VARCHAR(255) NOT NULL,
                    stored_name VARCHAR(255) NOT NULL UNIQUE,
                    mime_type VARCHAR(100) NOT NULL,
                    size_bytes BIGINT NOT NULL CHECK (size_bytes >= 0),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_attachments_task_id ON attachments(task_id);
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
                DROP TABLE IF EXISTS attachments CASCADE;
                DROP TABLE IF EXISTS comments CASCADE;
                DROP TABLE IF EXISTS task_tags CASCADE;
                DROP TABLE IF EXISTS tags CASCADE;
                DROP TABLE IF EXISTS tasks CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
