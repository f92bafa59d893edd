//! Aggregate task statistics.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Select};
use uuid::Uuid;

use crate::entity::task::{self, Entity as Task};
use crate::error::AppResult;
use crate::models::sprint::StatusCounts;
use crate::models::stats::AssigneeLoad;
use crate::models::task::TaskStatus;

use super::DbPool;

/// Real tasks, optionally limited to some projects.
fn real_tasks(project_ids: Option<&[Uuid]>) -> Select<Task> {
    let select = Task::find().filter(task::Column::IsPlaceholder.eq(false));
    match project_ids {
        Some(ids) => select.filter(task::Column::ProjectId.is_in(ids.iter().copied())),
        None => select,
    }
}

impl DbPool {
    pub async fn task_status_counts(&self, project_ids: Option<&[Uuid]>) -> AppResult<StatusCounts> {
        let rows: Vec<(String, i64)> = real_tasks(project_ids)
            .select_only()
            .column(task::Column::Status)
            .column_as(task::Column::Id.count(), "count")
            .group_by(task::Column::Status)
            .into_tuple()
            .all(self.connection())
            .await?;

        let counts: HashMap<TaskStatus, u64> = rows
            .into_iter()
            .filter_map(|(status, count)| {
                TaskStatus::parse(&status).map(|s| (s, count.max(0) as u64))
            })
            .collect();
        Ok(StatusCounts::from_map(&counts))
    }

    /// Tasks past their due date that are not completed.
    pub async fn overdue_task_count(&self, project_ids: Option<&[Uuid]>) -> AppResult<u64> {
        let today = Utc::now().date_naive();
        Ok(real_tasks(project_ids)
            .filter(task::Column::DueDate.lt(today))
            .filter(task::Column::Status.ne(TaskStatus::Completed.as_str()))
            .count(self.connection())
            .await?)
    }

    /// Per-assignee totals, busiest first.
    pub async fn tasks_by_assignee(&self, project_ids: Option<&[Uuid]>) -> AppResult<Vec<AssigneeLoad>> {
        let rows: Vec<(Option<Uuid>, Option<String>, String, i64)> = real_tasks(project_ids)
            .select_only()
            .column(task::Column::AssigneeId)
            .column(task::Column::AssigneeName)
            .column(task::Column::Status)
            .column_as(task::Column::Id.count(), "count")
            .filter(task::Column::AssigneeId.is_not_null())
            .group_by(task::Column::AssigneeId)
            .group_by(task::Column::AssigneeName)
            .group_by(task::Column::Status)
            .into_tuple()
            .all(self.connection())
            .await?;

        let mut loads: BTreeMap<Uuid, AssigneeLoad> = BTreeMap::new();
        for (assignee_id, assignee_name, status, count) in rows {
            let Some(user_id) = assignee_id else { continue };
            let count = count.max(0) as u64;
            let load = loads.entry(user_id).or_insert_with(|| AssigneeLoad {
                user_id,
                name: None,
                total: 0,
                completed: 0,
            });
            if load.name.is_none() {
                load.name = assignee_name;
            }
            load.total += count;
            if TaskStatus::parse(&status) == Some(TaskStatus::Completed) {
                load.completed += count;
            }
        }

        let mut loads: Vec<AssigneeLoad> = loads.into_values().collect();
        loads.sort_by(|a, b| b.total.cmp(&a.total).then(a.name.cmp(&b.name)));
        Ok(loads)
    }
}
