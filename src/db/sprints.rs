//! Database queries for sprints.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::sprint::{self, ActiveModel, Entity as Sprint};
use crate::entity::task;
use crate::error::{AppError, AppResult};
use crate::models::sprint::{StatusCounts, UpdateSprintRequest};
use crate::models::task::TaskStatus;
use crate::models::{AuthenticatedUser, PaginationParams};

use super::DbPool;

pub struct NewSprint {
    pub project_id: Uuid,
    pub name: String,
    pub goal: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DbPool {
    pub async fn insert_sprint(&self, new: NewSprint) -> AppResult<sprint::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(new.project_id),
            name: Set(new.name.trim().to_string()),
            goal: Set(new.goal),
            start_date: Set(new.start_date),
            end_date: Set(new.end_date),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(self.connection()).await?)
    }

    pub async fn get_sprint(&self, id: Uuid) -> AppResult<sprint::Model> {
        Sprint::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Sprint".to_string()))
    }

    pub async fn list_sprints(
        &self,
        actor: &AuthenticatedUser,
        project_id: Option<Uuid>,
        page: &PaginationParams,
    ) -> AppResult<(Vec<sprint::Model>, u64)> {
        let mut select = Sprint::find();
        if let Some(project_id) = project_id {
            select = select.filter(sprint::Column::ProjectId.eq(project_id));
        }
        if !actor.is_admin() {
            let visible = self.visible_project_ids(actor.id).await?;
            select = select.filter(sprint::Column::ProjectId.is_in(visible));
        }

        let total = select.clone().count(self.connection()).await?;
        let sprints = select
            .order_by_desc(sprint::Column::StartDate)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;
        Ok((sprints, total))
    }

    pub async fn update_sprint(
        &self,
        existing: sprint::Model,
        req: &UpdateSprintRequest,
    ) -> AppResult<sprint::Model> {
        let mut active: ActiveModel = existing.into();
        if let Some(name) = &req.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(goal) = &req.goal {
            active.goal = Set(goal.clone());
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

    pub async fn delete_sprint(&self, id: Uuid) -> AppResult<bool> {
        let result = Sprint::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }

    /// Task counts per status for each sprint.
    pub async fn sprint_task_counts(
        &self,
        sprint_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, StatusCounts>> {
        if sprint_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Option<Uuid>, String, i64)> = task::Entity::find()
            .select_only()
            .column(task::Column::SprintId)
            .column(task::Column::Status)
            .column_as(task::Column::Id.count(), "count")
            .filter(task::Column::SprintId.is_in(sprint_ids.iter().copied()))
            .filter(task::Column::IsPlaceholder.eq(false))
            .group_by(task::Column::SprintId)
            .group_by(task::Column::Status)
            .into_tuple()
            .all(self.connection())
            .await?;

        let mut raw: HashMap<Uuid, HashMap<TaskStatus, u64>> = HashMap::new();
        for (sprint_id, status, count) in rows {
            let (Some(sprint_id), Some(status)) = (sprint_id, TaskStatus::parse(&status)) else {
                continue;
            };
            raw.entry(sprint_id)
                .or_default()
                .insert(status, count.max(0) as u64);
        }

        Ok(raw
            .into_iter()
            .map(|(id, counts)| (id, StatusCounts::from_map(&counts)))
            .collect())
    }
}
