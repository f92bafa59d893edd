//! Database queries for the tag catalogue and task/tag links.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::tag::{self, ActiveModel, Entity as Tag};
use crate::entity::task_tag;
use crate::error::{AppError, AppResult};
use crate::models::PaginationParams;
use crate::models::tag::UpdateTagRequest;

use super::DbPool;

impl DbPool {
    pub async fn insert_tag(&self, name: &str, color: &str, created_by: Uuid) -> AppResult<tag::Model> {
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.trim().to_string()),
            color: Set(color.to_string()),
            created_by: Set(created_by),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(self.connection()).await?)
    }

    pub async fn get_tag(&self, id: Uuid) -> AppResult<tag::Model> {
        Tag::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Etiqueta".to_string()))
    }

    pub async fn list_tags(&self, page: &PaginationParams) -> AppResult<(Vec<tag::Model>, u64)> {
        let select = Tag::find();
        let total = select.clone().count(self.connection()).await?;
        let tags = select
            .order_by_asc(tag::Column::Name)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;
        Ok((tags, total))
    }

    pub async fn update_tag(&self, existing: tag::Model, req: &UpdateTagRequest) -> AppResult<tag::Model> {
        let mut active: ActiveModel = existing.into();
        if let Some(name) = &req.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(color) = &req.color {
            active.color = Set(color.clone());
        }
        Ok(active.update(self.connection()).await?)
    }

    pub async fn delete_tag(&self, id: Uuid) -> AppResult<bool> {
        let result = Tag::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }

    /// Link a tag to a task. Returns false when already linked.
    pub async fn attach_tag(&self, task_id: Uuid, tag_id: Uuid) -> AppResult<bool> {
        let existing = task_tag::Entity::find()
            .filter(task_tag::Column::TaskId.eq(task_id))
            .filter(task_tag::Column::TagId.eq(tag_id))
            .count(self.connection())
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let link = task_tag::ActiveModel {
            task_id: Set(task_id),
            tag_id: Set(tag_id),
        };
        task_tag::Entity::insert(link)
            .exec_without_returning(self.connection())
            .await?;
        Ok(true)
    }

    pub async fn detach_tag(&self, task_id: Uuid, tag_id: Uuid) -> AppResult<bool> {
        let result = task_tag::Entity::delete_many()
            .filter(task_tag::Column::TaskId.eq(task_id))
            .filter(task_tag::Column::TagId.eq(tag_id))
            .exec(self.connection())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Ensure every id names an existing tag.
    pub async fn ensure_tags_exist(&self, ids: &[Uuid]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = Tag::find()
            .filter(tag::Column::Id.is_in(ids.iter().copied()))
            .count(self.connection())
            .await?;
        let mut unique = ids.to_vec();
        unique.sort();
        unique.dedup();
        if found as usize != unique.len() {
            return Err(AppError::InvalidInput("Etiqueta inexistente".to_string()));
        }
        Ok(())
    }
}
