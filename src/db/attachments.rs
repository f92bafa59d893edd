//! Database queries for task attachments.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::attachment::{self, ActiveModel, Entity as Attachment};
use crate::error::{AppError, AppResult};

use super::DbPool;

pub struct NewAttachment {
    pub task_id: Uuid,
    pub uploaded_by: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

impl DbPool {
    pub async fn insert_attachment(&self, new: NewAttachment) -> AppResult<attachment::Model> {
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            task_id: Set(new.task_id),
            uploaded_by: Set(new.uploaded_by),
            original_name: Set(new.original_name),
            stored_name: Set(new.stored_name),
            mime_type: Set(new.mime_type),
            size_bytes: Set(new.size_bytes),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(self.connection()).await?)
    }

    pub async fn get_attachment(&self, id: Uuid) -> AppResult<attachment::Model> {
        Attachment::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Archivo".to_string()))
    }

    pub async fn find_attachment_by_stored_name(
        &self,
        stored_name: &str,
    ) -> AppResult<Option<attachment::Model>> {
        Ok(Attachment::find()
            .filter(attachment::Column::StoredName.eq(stored_name))
            .one(self.connection())
            .await?)
    }

    pub async fn list_attachments(&self, task_id: Uuid) -> AppResult<Vec<attachment::Model>> {
        Ok(Attachment::find()
            .filter(attachment::Column::TaskId.eq(task_id))
            .order_by_desc(attachment::Column::CreatedAt)
            .all(self.connection())
            .await?)
    }

    /// Stored names of every attachment of a task, used to remove files
    /// before the rows cascade away.
    pub async fn stored_names_for_task(&self, task_id: Uuid) -> AppResult<Vec<String>> {
        Ok(Attachment::find()
            .select_only()
            .column(attachment::Column::StoredName)
            .filter(attachment::Column::TaskId.eq(task_id))
            .into_tuple()
            .all(self.connection())
            .await?)
    }

    /// Sum of attachment sizes for a task.
    pub async fn task_attachments_size(&self, task_id: Uuid) -> AppResult<i64> {
        // SUM(BIGINT) is NUMERIC in PostgreSQL.
        let total: Option<i64> = Attachment::find()
            .select_only()
            .column_as(Expr::cust("COALESCE(SUM(size_bytes), 0)::BIGINT"), "total")
            .filter(attachment::Column::TaskId.eq(task_id))
            .into_tuple()
            .one(self.connection())
            .await?;
        Ok(total.unwrap_or(0))
    }

    pub async fn delete_attachment(&self, id: Uuid) -> AppResult<bool> {
        let result = Attachment::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn attachment_ids_for_tasks(&self, task_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Attachment::find()
            .select_only()
            .column(attachment::Column::Id)
            .filter(attachment::Column::TaskId.is_in(task_ids.iter().copied()))
            .into_tuple()
            .all(self.connection())
            .await?)
    }
}
