//! Database queries for projects.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::project::{self, ActiveModel, Entity as Project};
use crate::entity::{project_member, task};
use crate::error::{AppError, AppResult};
use crate::models::project::UpdateProjectRequest;
use crate::models::{AuthenticatedUser, PaginationParams};

use super::DbPool;

pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub manager_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DbPool {
    pub async fn insert_project(&self, new: NewProject) -> AppResult<project::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(new.name.trim().to_string()),
            description: Set(new.description),
            creator_id: Set(new.creator_id),
            manager_id: Set(new.manager_id),
            start_date: Set(new.start_date),
            end_date: Set(new.end_date),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(self.connection()).await?)
    }

    pub async fn find_project(&self, id: Uuid) -> AppResult<Option<project::Model>> {
        Ok(Project::find_by_id(id).one(self.connection()).await?)
    }

    /// Fetch a project or fail with 404.
    pub async fn get_project(&self, id: Uuid) -> AppResult<project::Model> {
        self.find_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Proyecto".to_string()))
    }

    /// Projects visible to the caller: all for administrators, otherwise the
    /// ones the caller is a member of.
    pub async fn list_projects(
        &self,
        actor: &AuthenticatedUser,
        page: &PaginationParams,
    ) -> AppResult<(Vec<project::Model>, u64)> {
        let mut select = Project::find();

        if !actor.is_admin() {
            let visible = self.visible_project_ids(actor.id).await?;
            select = select.filter(project::Column::Id.is_in(visible));
        }

        let total = select.clone().count(self.connection()).await?;

        let projects = select
            .order_by_desc(project::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;

        Ok((projects, total))
    }

    /// Ids of every project the user belongs to: as creator, as manager,
    /// through an explicit membership row or by holding a real task.
    pub async fn visible_project_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut ids: BTreeSet<Uuid> = Project::find()
            .select_only()
            .column(project::Column::Id)
            .filter(
                Condition::any()
                    .add(project::Column::CreatorId.eq(user_id))
                    .add(project::Column::ManagerId.eq(user_id)),
            )
            .into_tuple::<Uuid>()
            .all(self.connection())
            .await?
            .into_iter()
            .collect();

        let explicit: Vec<Uuid> = project_member::Entity::find()
            .select_only()
            .column(project_member::Column::ProjectId)
            .filter(project_member::Column::UserId.eq(user_id))
            .into_tuple()
            .all(self.connection())
            .await?;
        ids.extend(explicit);

        let through_tasks: Vec<Uuid> = task::Entity::find()
            .select_only()
            .column(task::Column::ProjectId)
            .distinct()
            .filter(task::Column::AssigneeId.eq(user_id))
            .filter(task::Column::IsPlaceholder.eq(false))
            .into_tuple()
            .all(self.connection())
            .await?;
        ids.extend(through_tasks);

        Ok(ids.into_iter().collect())
    }

    /// Whether the user belongs to the project (administrators excluded).
    pub async fn is_project_member(&self, project: &project::Model, user_id: Uuid) -> AppResult<bool> {
        if project.creator_id == user_id || project.manager_id == user_id {
            return Ok(true);
        }

        let explicit = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project.id))
            .filter(project_member::Column::UserId.eq(user_id))
            .count(self.connection())
            .await?;
        if explicit > 0 {
            return Ok(true);
        }

        let tasks = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project.id))
            .filter(task::Column::AssigneeId.eq(user_id))
            .filter(task::Column::IsPlaceholder.eq(false))
            .count(self.connection())
            .await?;
        Ok(tasks > 0)
    }

    /// Ids of the projects the user manages.
    pub async fn managed_project_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(Project::find()
            .select_only()
            .column(project::Column::Id)
            .filter(project::Column::ManagerId.eq(user_id))
            .into_tuple()
            .all(self.connection())
            .await?)
    }

    /// Whether the user created or manages any project.
    pub async fn owns_or_manages_any_project(&self, user_id: Uuid) -> AppResult<bool> {
        let count = Project::find()
            .filter(
                Condition::any()
                    .add(project::Column::CreatorId.eq(user_id))
                    .add(project::Column::ManagerId.eq(user_id)),
            )
            .count(self.connection())
            .await?;
        Ok(count > 0)
    }

    pub async fn update_project(
        &self,
        existing: project::Model,
        req: &UpdateProjectRequest,
    ) -> AppResult<project::Model> {
        let mut active: ActiveModel = existing.into();
        if let Some(name) = &req.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = &req.description {
            active.description = Set(description.clone());
        }
        if let Some(manager_id) = req.manager_id {
            active.manager_id = Set(manager_id);
        }
        if let Some(start_date) = req.start_date {
            active.start_date = Set(start_date);
        }
        if let Some(end_date) = req.end_date {
            active.end_date = Set(end_date);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(self.connection()).await?)
    }

    /// Delete a project; tasks, sprints, releases and members cascade.
    pub async fn delete_project(&self, id: Uuid) -> AppResult<bool> {
        let result = Project::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count_projects(&self, ids: Option<&[Uuid]>) -> AppResult<u64> {
        let mut select = Project::find();
        if let Some(ids) = ids {
            select = select.filter(project::Column::Id.is_in(ids.iter().copied()));
        }
        Ok(select.count(self.connection()).await?)
    }
}
