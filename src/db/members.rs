//! Explicit project membership rows and the membership union.

use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set};
use uuid::Uuid;

use crate::entity::project_member::{self, ActiveModel, Entity as ProjectMember};
use crate::entity::{project, task, user};
use crate::error::AppResult;

use super::DbPool;

impl DbPool {
    /// Users belonging to a project: creator, manager, explicit members and
    /// holders of at least one real task.
    pub async fn project_member_ids(&self, project: &project::Model) -> AppResult<Vec<Uuid>> {
        let mut ids = BTreeSet::from([project.creator_id, project.manager_id]);

        let explicit: Vec<Uuid> = ProjectMember::find()
            .select_only()
            .column(project_member::Column::UserId)
            .filter(project_member::Column::ProjectId.eq(project.id))
            .into_tuple()
            .all(self.connection())
            .await?;
        ids.extend(explicit);

        let assignees: Vec<Option<Uuid>> = task::Entity::find()
            .select_only()
            .column(task::Column::AssigneeId)
            .distinct()
            .filter(task::Column::ProjectId.eq(project.id))
            .filter(task::Column::IsPlaceholder.eq(false))
            .filter(task::Column::AssigneeId.is_not_null())
            .into_tuple()
            .all(self.connection())
            .await?;
        ids.extend(assignees.into_iter().flatten());

        Ok(ids.into_iter().collect())
    }

    pub async fn project_members(&self, project: &project::Model) -> AppResult<Vec<user::Model>> {
        let ids = self.project_member_ids(project).await?;
        self.find_users_by_ids(&ids).await
    }

    /// Insert an explicit membership row. Returns false when it already existed.
    pub async fn add_project_member(&self, project_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let existing = ProjectMember::find()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .count(self.connection())
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(project_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };
        ProjectMember::insert(model).exec(self.connection()).await?;
        Ok(true)
    }

    pub async fn remove_project_member(&self, project_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = ProjectMember::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .exec(self.connection())
            .await?;
        Ok(result.rows_affected > 0)
    }
}
