//! Sprint models.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::double_option;
use super::task::TaskStatus;
use crate::entity::sprint;

/// Number of tasks per status inside a sprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    #[serde(rename = "Pendiente")]
    pub pending: u64,
    #[serde(rename = "EnProgreso")]
    pub in_progress: u64,
    #[serde(rename = "EnRevision")]
    pub in_review: u64,
    #[serde(rename = "Completada")]
    pub completed: u64,
    pub total: u64,
}

impl StatusCounts {
    pub fn from_map(counts: &HashMap<TaskStatus, u64>) -> Self {
        let get = |s| counts.get(&s).copied().unwrap_or(0);
        let pending = get(TaskStatus::Pending);
        let in_progress = get(TaskStatus::InProgress);
        let in_review = get(TaskStatus::InReview);
        let completed = get(TaskStatus::Completed);
        Self {
            pending,
            in_progress,
            in_review,
            completed,
            total: pending + in_progress + in_review + completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SprintResponse {
    pub id: Uuid,
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "objetivo")]
    pub goal: Option<String>,
    #[serde(rename = "fechaInicio")]
    pub start_date: NaiveDate,
    #[serde(rename = "fechaFin")]
    pub end_date: NaiveDate,
    #[serde(rename = "tareas")]
    pub task_counts: StatusCounts,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl SprintResponse {
    pub fn new(m: sprint::Model, task_counts: StatusCounts) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            name: m.name,
            goal: m.goal,
            start_date: m.start_date,
            end_date: m.end_date,
            task_counts,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSprintRequest {
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 100, message = "El nombre debe tener entre 1 y 100 caracteres"))]
    pub name: String,
    #[serde(rename = "objetivo", default)]
    #[validate(length(max = 2000, message = "El objetivo es demasiado largo"))]
    pub goal: Option<String>,
    #[serde(rename = "fechaInicio")]
    pub start_date: NaiveDate,
    #[serde(rename = "fechaFin")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSprintRequest {
    #[serde(rename = "nombre", default)]
    #[validate(length(min = 1, max = 100, message = "El nombre debe tener entre 1 y 100 caracteres"))]
    pub name: Option<String>,
    #[serde(rename = "objetivo", default, deserialize_with = "double_option")]
    pub goal: Option<Option<String>>,
    #[serde(rename = "fechaInicio", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fechaFin", default)]
    pub end_date: Option<NaiveDate>,
}

impl UpdateSprintRequest {
    pub fn submitted_fields(&self) -> Vec<&'static str> {
        [
            ("nombre", self.name.is_some()),
            ("objetivo", self.goal.is_some()),
            ("fechaInicio", self.start_date.is_some()),
            ("fechaFin", self.end_date.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

/// `?proyectoId=` filter shared by sprint and release listings.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectScopedQuery {
    #[serde(rename = "proyectoId", default)]
    pub project_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_total() {
        let mut map = HashMap::new();
        map.insert(TaskStatus::Pending, 3);
        map.insert(TaskStatus::Completed, 2);
        let counts = StatusCounts::from_map(&map);
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.in_review, 0);
        assert_eq!(counts.total, 5);

        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["Completada"], 2);
    }
}
