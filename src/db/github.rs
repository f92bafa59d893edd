//! Database queries for GitHub tokens and linked repositories.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::github_token::{self, Entity as GitHubToken};
use crate::entity::repository::{self, Entity as Repository};
use crate::error::{AppError, AppResult};
use crate::models::github::UpdateRepositoryRequest;

use super::DbPool;

impl DbPool {
    /// Insert or replace the encrypted token of a project.
    pub async fn upsert_github_token(
        &self,
        project_id: Uuid,
        encrypted_token: String,
        actor_id: Uuid,
    ) -> AppResult<github_token::Model> {
        let now = Utc::now();
        if let Some(existing) = self.find_github_token(project_id).await? {
            let mut active: github_token::ActiveModel = existing.into();
            active.encrypted_token = Set(encrypted_token);
            active.created_by = Set(actor_id);
            active.updated_at = Set(now);
            return Ok(active.update(self.connection()).await?);
        }

        let model = github_token::ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(project_id),
            encrypted_token: Set(encrypted_token),
            created_by: Set(actor_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(self.connection()).await?)
    }

    pub async fn find_github_token(&self, project_id: Uuid) -> AppResult<Option<github_token::Model>> {
        Ok(GitHubToken::find()
            .filter(github_token::Column::ProjectId.eq(project_id))
            .one(self.connection())
            .await?)
    }

    pub async fn delete_github_token(&self, project_id: Uuid) -> AppResult<bool> {
        let result = GitHubToken::delete_many()
            .filter(github_token::Column::ProjectId.eq(project_id))
            .exec(self.connection())
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn insert_repository(
        &self,
        project_id: Uuid,
        owner: &str,
        name: &str,
        branch: Option<String>,
    ) -> AppResult<repository::Model> {
        let model = repository::ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(project_id),
            owner: Set(owner.to_string()),
            name: Set(name.to_string()),
            branch: Set(branch),
            last_commit_sha: Set(None),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(self.connection()).await?)
    }

    pub async fn get_repository(&self, id: Uuid) -> AppResult<repository::Model> {
        Repository::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Repositorio".to_string()))
    }

    pub async fn list_repositories(&self, project_id: Uuid) -> AppResult<Vec<repository::Model>> {
        Ok(Repository::find()
            .filter(repository::Column::ProjectId.eq(project_id))
            .order_by_asc(repository::Column::Owner)
            .order_by_asc(repository::Column::Name)
            .all(self.connection())
            .await?)
    }

    pub async fn update_repository(
        &self,
        existing: repository::Model,
        req: &UpdateRepositoryRequest,
    ) -> AppResult<repository::Model> {
        let mut active: repository::ActiveModel = existing.into();
        if let Some(owner) = &req.owner {
            active.owner = Set(owner.clone());
        }
        if let Some(name) = &req.name {
            active.name = Set(name.clone());
        }
        if let Some(branch) = &req.branch {
            active.branch = Set(branch.clone());
        }
        // A different repository invalidates the last seen commit.
        if req.owner.is_some() || req.name.is_some() || req.branch.is_some() {
            active.last_commit_sha = Set(None);
        }
        Ok(active.update(self.connection()).await?)
    }

    pub async fn set_last_commit_sha(&self, id: Uuid, sha: &str) -> AppResult<()> {
        let mut active: repository::ActiveModel = self.get_repository(id).await?.into();
        active.last_commit_sha = Set(Some(sha.to_string()));
        active.update(self.connection()).await?;
        Ok(())
    }

    pub async fn delete_repository(&self, id: Uuid) -> AppResult<bool> {
        let result = Repository::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }
}
