//! Database queries for releases.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::release::{self, ActiveModel, Entity as Release};
use crate::error::{AppError, AppResult};
use crate::models::release::{ReleaseStatus, UpdateReleaseRequest};
use crate::models::{AuthenticatedUser, PaginationParams};

use super::DbPool;

pub struct NewRelease {
    pub project_id: Uuid,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub status: ReleaseStatus,
}

impl DbPool {
    pub async fn insert_release(&self, new: NewRelease) -> AppResult<release::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(new.project_id),
            name: Set(new.name.trim().to_string()),
            version: Set(new.version.trim().to_string()),
            description: Set(new.description),
            release_date: Set(new.release_date),
            status: Set(new.status.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(self.connection()).await?)
    }

    pub async fn get_release(&self, id: Uuid) -> AppResult<release::Model> {
        Release::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Release".to_string()))
    }

    pub async fn list_releases(
        &self,
        actor: &AuthenticatedUser,
        project_id: Option<Uuid>,
        page: &PaginationParams,
    ) -> AppResult<(Vec<release::Model>, u64)> {
        let mut select = Release::find();
        if let Some(project_id) = project_id {
            select = select.filter(release::Column::ProjectId.eq(project_id));
        }
        if !actor.is_admin() {
            let visible = self.visible_project_ids(actor.id).await?;
            select = select.filter(release::Column::ProjectId.is_in(visible));
        }

        let total = select.clone().count(self.connection()).await?;
        let releases = select
            .order_by_desc(release::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;
        Ok((releases, total))
    }

    pub async fn update_release(
        &self,
        existing: release::Model,
        req: &UpdateReleaseRequest,
    ) -> AppResult<release::Model> {
        let mut active: ActiveModel = existing.into();
        if let Some(name) = &req.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(version) = &req.version {
            active.version = Set(version.trim().to_string());
        }
        if let Some(description) = &req.description {
            active.description = Set(description.clone());
        }
        if let Some(release_date) = req.release_date {
            active.release_date = Set(release_date);
        }
        if let Some(status) = req.status {
            active.status = Set(status.as_str().to_string());
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.connection()).await?)
    }

    pub async fn delete_release(&self, id: Uuid) -> AppResult<bool> {
        let result = Release::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }
}
