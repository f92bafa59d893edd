//! Database queries for per-user notifications.

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use crate::entity::notification::{self, ActiveModel, Entity as Notification};
use crate::error::{AppError, AppResult};
use crate::models::notification::{NotificationDraft, NotificationKind, NotificationListQuery};
use crate::models::{AuthenticatedUser, PaginationParams};

use super::DbPool;

/// Restrict a notification query to what the caller may see.
/// Only administrators receive issue notifications.
fn visible_to(
    select: sea_orm::Select<Notification>,
    actor: &AuthenticatedUser,
) -> sea_orm::Select<Notification> {
    let select = select.filter(notification::Column::UserId.eq(actor.id));
    if actor.is_admin() {
        select
    } else {
        select.filter(notification::Column::Kind.ne(NotificationKind::Issue.as_str()))
    }
}

impl DbPool {
    /// Write one row per recipient.
    pub async fn insert_notifications(
        &self,
        draft: &NotificationDraft,
        recipients: &[Uuid],
    ) -> AppResult<u64> {
        if recipients.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let rows = recipients.iter().map(|user_id| ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(*user_id),
            kind: Set(draft.kind.as_str().to_string()),
            title: Set(draft.title.clone()),
            description: Set(draft.description.clone()),
            read: Set(false),
            task_id: Set(draft.task_id),
            project_id: Set(draft.project_id),
            issue_id: Set(draft.issue_id),
            created_at: Set(now),
        });

        Notification::insert_many(rows)
            .exec_without_returning(self.connection())
            .await?;
        Ok(recipients.len() as u64)
    }

    pub async fn list_notifications(
        &self,
        actor: &AuthenticatedUser,
        query: &NotificationListQuery,
        page: &PaginationParams,
    ) -> AppResult<(Vec<notification::Model>, u64)> {
        let mut select = visible_to(Notification::find(), actor);
        if let Some(read) = query.read {
            select = select.filter(notification::Column::Read.eq(read));
        }

        let total = select.clone().count(self.connection()).await?;
        let rows = select
            .order_by_desc(notification::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;
        Ok((rows, total))
    }

    pub async fn count_unread_notifications(&self, actor: &AuthenticatedUser) -> AppResult<u64> {
        Ok(visible_to(Notification::find(), actor)
            .filter(notification::Column::Read.eq(false))
            .count(self.connection())
            .await?)
    }

    /// Fetch one of the caller's own notifications.
    pub async fn get_own_notification(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> AppResult<notification::Model> {
        visible_to(Notification::find_by_id(id), actor)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Notificación".to_string()))
    }

    pub async fn mark_notification_read(&self, actor: &AuthenticatedUser, id: Uuid) -> AppResult<()> {
        self.get_own_notification(actor, id).await?;
        Notification::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .exec(self.connection())
            .await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, actor: &AuthenticatedUser) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::UserId.eq(actor.id))
            .filter(notification::Column::Read.eq(false))
            .exec(self.connection())
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_notification(&self, actor: &AuthenticatedUser, id: Uuid) -> AppResult<()> {
        self.get_own_notification(actor, id).await?;
        Notification::delete_by_id(id)
            .exec(self.connection())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_employees_never_query_issue_notifications() {
        let employee = AuthenticatedUser {
            id: Uuid::nil(),
            role: Role::Employee,
        };
        let sql = visible_to(Notification::find(), &employee)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""kind" <> 'issue'"#), "{}", sql);

        let admin = AuthenticatedUser {
            id: Uuid::nil(),
            role: Role::Administrator,
        };
        let sql = visible_to(Notification::find(), &admin)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(!sql.contains("'issue'"), "{}", sql);
    }
}
