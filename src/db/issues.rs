use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::issue::{self, ActiveModel, Entity as Issue};
use crate::error::{AppError, AppResult};
use crate::models::issue::{IssueKind, IssueListQuery, IssueStatus};
use crate::models::{AuthenticatedUser, PaginationParams};

use super::DbPool;

impl DbPool {
    pub async fn insert_issue(
        &self,
        reporter_id: Uuid,
        project_id: Option<Uuid>,
        title: &str,
        description: &str,
        kind: IssueKind,
    ) -> AppResult<issue::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(project_id),
            reporter_id: Set(reporter_id),
            title: Set(title.trim().to_string()),
            description: Set(description.trim().to_string()),
            kind: Set(kind.as_str().to_string()),
            status: Set(IssueStatus::Abierto.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(self.connection()).await?)
    }

    pub async fn get_issue(&self, id: Uuid) -> AppResult<issue::Model> {
        Issue::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Issue".to_string()))
    }

    /// Administrators list every issue, others only their own reports.
    pub async fn list_issues(
        &self,
        actor: &AuthenticatedUser,
        query: &IssueListQuery,
        page: &PaginationParams,
    ) -> AppResult<(Vec<issue::Model>, u64)> {
        let mut select = Issue::find();
        if !actor.is_admin() {
            select = select.filter(issue::Column::ReporterId.eq(actor.id));
        }
        if let Some(status) = query.status {
            select = select.filter(issue::Column::Status.eq(status.as_str()));
        }
        if let Some(kind) = query.kind {
            select = select.filter(issue::Column::Kind.eq(kind.as_str()));
        }

        let total = select.clone().count(self.connection()).await?;
        let issues = select
            .order_by_desc(issue::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;
        Ok((issues, total))
    }

    pub async fn update_issue_status(
        &self,
        existing: issue::Model,
        status: IssueStatus,
    ) -> AppResult<issue::Model> {
        let mut active: ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.connection()).await?)
    }

    pub async fn delete_issue(&self, id: Uuid) -> AppResult<bool> {
        let result = Issue::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }
}
