use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::comment::{self, ActiveModel, Entity as Comment};
use crate::error::{AppError, AppResult};
use crate::models::PaginationParams;

use super::DbPool;

impl DbPool {
    pub async fn insert_comment(
        &self,
        task_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> AppResult<comment::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            task_id: Set(task_id),
            author_id: Set(author_id),
            content: Set(content.trim().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(self.connection()).await?)
    }

    pub async fn get_comment(&self, id: Uuid) -> AppResult<comment::Model> {
        Comment::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Comentario".to_string()))
    }

    /// Comments of a task, oldest first.
    pub async fn list_comments(
        &self,
        task_id: Uuid,
        page: &PaginationParams,
    ) -> AppResult<(Vec<comment::Model>, u64)> {
        let select = Comment::find().filter(comment::Column::TaskId.eq(task_id));
        let total = select.clone().count(self.connection()).await?;
        let comments = select
            .order_by_asc(comment::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;
        Ok((comments, total))
    }

    pub async fn update_comment(&self, existing: comment::Model, content: &str) -> AppResult<comment::Model> {
        let mut active: ActiveModel = existing.into();
        active.content = Set(content.trim().to_string());
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.connection()).await?)
    }

    pub async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        let result = Comment::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }

    /// Ids of comments on the given tasks.
    pub async fn comment_ids_for_tasks(&self, task_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Comment::find()
            .select_only()
            .column(comment::Column::Id)
            .filter(comment::Column::TaskId.is_in(task_ids.iter().copied()))
            .into_tuple()
            .all(self.connection())
            .await?)
    }
}
