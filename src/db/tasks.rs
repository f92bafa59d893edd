//! Database queries for tasks.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::task::{self, ActiveModel, Entity as Task};
use crate::entity::{tag, task_tag};
use crate::error::{AppError, AppResult};
use crate::models::tag::TagResponse;
use crate::models::task::{TaskAssignment, TaskListQuery, TaskResponse, TaskStatus};
use crate::models::{AuthenticatedUser, PaginationParams};

use super::DbPool;

pub struct NewTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: String,
    pub assignment: TaskAssignment,
    pub creator_id: Uuid,
    pub sprint_id: Option<Uuid>,
    pub release_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

impl DbPool {
    pub async fn insert_task(&self, new: NewTask) -> AppResult<task::Model> {
        let now = Utc::now();
        let mut model = ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(new.project_id),
            title: Set(new.title.trim().to_string()),
            description: Set(new.description),
            status: Set(new.status.as_str().to_string()),
            priority: Set(new.priority),
            creator_id: Set(new.creator_id),
            sprint_id: Set(new.sprint_id),
            release_id: Set(new.release_id),
            due_date: Set(new.due_date),
            is_placeholder: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        new.assignment.apply(&mut model);

        Ok(model.insert(self.connection()).await?)
    }

    pub async fn find_task(&self, id: Uuid) -> AppResult<Option<task::Model>> {
        Ok(Task::find_by_id(id).one(self.connection()).await?)
    }

    /// Fetch a real task or fail with 404. Placeholder rows are invisible.
    pub async fn get_task(&self, id: Uuid) -> AppResult<task::Model> {
        self.find_task(id)
            .await?
            .filter(|t| !t.is_placeholder)
            .ok_or_else(|| AppError::NotFound("Tarea".to_string()))
    }

    pub async fn list_tasks(
        &self,
        actor: &AuthenticatedUser,
        query: &TaskListQuery,
        page: &PaginationParams,
    ) -> AppResult<(Vec<task::Model>, u64)> {
        let mut select = Task::find().filter(task::Column::IsPlaceholder.eq(false));

        if !actor.is_admin() {
            let visible = self.visible_project_ids(actor.id).await?;
            select = select.filter(task::Column::ProjectId.is_in(visible));
        }

        if let Some(project_id) = query.project_id {
            select = select.filter(task::Column::ProjectId.eq(project_id));
        }
        if let Some(status) = query.status {
            select = select.filter(task::Column::Status.eq(status.as_str()));
        }
        if let Some(assignee_id) = query.assignee_id {
            select = select.filter(task::Column::AssigneeId.eq(assignee_id));
        }
        if let Some(sprint_id) = query.sprint_id {
            select = select.filter(task::Column::SprintId.eq(sprint_id));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = super::contains_pattern(search);
            select = select.filter(Expr::cust_with_values(
                "(title ILIKE $1 OR COALESCE(description, '') ILIKE $2)",
                [pattern.clone(), pattern],
            ));
        }

        let total = select.clone().count(self.connection()).await?;

        let tasks = select
            .order_by_desc(task::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;

        Ok((tasks, total))
    }

    /// Persist an already-modified task.
    pub async fn save_task(&self, mut active: ActiveModel) -> AppResult<task::Model> {
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.connection()).await?)
    }

    pub async fn delete_task(&self, id: Uuid) -> AppResult<bool> {
        let result = Task::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }

    /// Tags of each task, keyed by task id.
    pub async fn tags_for_tasks(
        &self,
        task_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<TagResponse>>> {
        let mut by_task: HashMap<Uuid, Vec<TagResponse>> = HashMap::new();
        if task_ids.is_empty() {
            return Ok(by_task);
        }

        let links = task_tag::Entity::find()
            .filter(task_tag::Column::TaskId.is_in(task_ids.iter().copied()))
            .all(self.connection())
            .await?;
        if links.is_empty() {
            return Ok(by_task);
        }

        let tags: HashMap<Uuid, tag::Model> = tag::Entity::find()
            .filter(tag::Column::Id.is_in(links.iter().map(|l| l.tag_id)))
            .all(self.connection())
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        for link in links {
            if let Some(tag) = tags.get(&link.tag_id) {
                by_task
                    .entry(link.task_id)
                    .or_default()
                    .push(TagResponse::from(tag.clone()));
            }
        }
        for list in by_task.values_mut() {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }

        Ok(by_task)
    }

    /// Build API responses for tasks, attaching their tags.
    pub async fn task_responses(&self, tasks: Vec<task::Model>) -> AppResult<Vec<TaskResponse>> {
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        let mut tags = self.tags_for_tasks(&ids).await?;
        Ok(tasks
            .into_iter()
            .map(|t| {
                let task_tags = tags.remove(&t.id).unwrap_or_default();
                TaskResponse::new(t, task_tags)
            })
            .collect())
    }

    pub async fn task_response(&self, task: task::Model) -> AppResult<TaskResponse> {
        let mut responses = self.task_responses(vec![task]).await?;
        responses
            .pop()
            .ok_or_else(|| AppError::Database("Task response missing".to_string()))
    }

    /// Ids of all tasks (placeholders included) in the given projects.
    pub async fn task_ids_in_projects(&self, project_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Task::find()
            .select_only()
            .column(task::Column::Id)
            .filter(task::Column::ProjectId.is_in(project_ids.iter().copied()))
            .into_tuple()
            .all(self.connection())
            .await?)
    }

    /// Map task ids to titles for those still present.
    pub async fn task_titles(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, String)> = Task::find()
            .select_only()
            .column(task::Column::Id)
            .column(task::Column::Title)
            .filter(task::Column::Id.is_in(ids.iter().copied()))
            .into_tuple()
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().collect())
    }
}
