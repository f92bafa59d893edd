//! Migration: Create projects, project_members, sprints and releases tables.

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
                CREATE TABLE projects (
                    id UUID PRIMARY KEY,
                    name VARCHAR(200) NOT NULL,
                    description TEXT,
                    creator_id UUID NOT NULL REFERENCES users(id),
                    manager_id UUID NOT NULL REFERENCES users(id),
                    start_date DATE,
                    end_date DATE,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_projects_creator_id ON projects(creator_id);
                CREATE INDEX idx_projects_manager_id ON projects(manager_id);

                CREATE TRIGGER update_projects_updated_at
                    BEFORE UPDATE ON projects
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();

                CREATE TABLE project_members (
                    id UUID PRIMARY KEY,
                    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX idx_project_members_unique
                    ON project_members(project_id, user_id);
                CREATE INDEX idx_project_members_user_id ON project_members(user_id);

                CREATE TABLE sprints (
                    id UUID PRIMARY KEY,
                    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    name VARCHAR(150) NOT NULL,
                    goal TEXT,
                    start_date DATE NOT NULL,
                    end_date DATE NOT NULL CHECK (end_date >= start_date),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_sprints_project_id ON sprints(project_id);

                CREATE TRIGGER update_sprints_updated_at
                    BEFORE UPDATE ON sprints
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();

                CREATE TABLE releases (
                    id UUID PRIMARY KEY,
                    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    name VARCHAR(150) NOT NULL,
                    version VARCHAR(50) NOT NULL,
                    description TEXT,
                    release_date DATE,
                    status VARCHAR(20) NOT NULL DEFAULT 'Planificada'
                        CHECK (status IN ('Planificada', 'EnProgreso', 'Publicada')),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX idx_releases_project_version ON releases(project_id, version);

                CREATE TRIGGER update_releases_updated_at
                    BEFORE UPDATE ON releases
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
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
                DROP TABLE IF EXISTS releases CASCADE;
                DROP TABLE IF EXISTS sprints CASCADE;
                DROP TABLE IF EXISTS project_members CASCADE;
                DROP TABLE IF EXISTS projects CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
