//! Migration: Create issues, github_tokens and repositories tables.

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
                CREATE TABLE issues (
                    id UUID PRIMARY KEY,
                    project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
                    reporter_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    title VARCHAR(255) NOT NULL,
                    description TEXT NOT NULL,
                    kind VARCHAR(20) NOT NULL DEFAULT 'Error'
                        CHECK (kind IN ('Error', 'Mejora', 'Pregunta')),
                    status VARCHAR(20) NOT NULL DEFAULT 'Abierto'
                        CHECK (status IN ('Abierto', 'EnProceso', 'Resuelto', 'Cerrado')),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_issues_reporter_id ON issues(reporter_id);

                CREATE TRIGGER update_issues_updated_at
                    BEFORE UPDATE ON issues
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();

                CREATE TABLE github_tokens (
                    id UUID PRIMARY KEY,
                    project_id UUID NOT NULL UNIQUE REFERENCES projects(id) ON DELETE CASCADE,
                    encrypted_token TEXT NOT NULL,
                    created_by UUID NOT NULL,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TRIGGER update_github_tokens_updated_at
                    BEFORE UPDATE ON github_tokens
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();

                CREATE TABLE repositories (
                    id UUID PRIMARY KEY,
                    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    owner VARCHAR(100) NOT NULL,
                    name VARCHAR(100) NOT NULL,
                    branch VARCHAR(100),
                    last_commit_sha VARCHAR(64),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX idx_repositories_unique
                    ON repositories(project_id, LOWER(owner), LOWER(name));
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
                DROP TABLE IF EXISTS repositories CASCADE;
                DROP TABLE IF EXISTS github_tokens CASCADE;
                DROP TABLE IF EXISTS issues CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
