//! Task models: status, assignment and request/response DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::UpdateMany;
use sea_orm::prelude::Expr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::double_option;
use super::tag::TagResponse;
use crate::entity::{task, user};

pub const DEFAULT_PRIORITY: &str = "Media";

/// Titles are stored trimmed, so the bounds apply to the trimmed text.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if (1..=200).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("length")
            .with_message("El título debe tener entre 1 y 200 caracteres".into()))
    }
}

/// Kanban column of a task. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "EnProgreso")]
    InProgress,
    #[serde(rename = "EnRevision")]
    InReview,
    #[serde(rename = "Completada")]
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        Self::Pending,
        Self::InProgress,
        Self::InReview,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::InProgress => "EnProgreso",
            Self::InReview => "EnRevision",
            Self::Completed => "Completada",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pendiente" => Some(Self::Pending),
            "EnProgreso" => Some(Self::InProgress),
            "EnRevision" => Some(Self::InReview),
            "Completada" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The only way to write `assignee_id` and its mirrored `assignee_name`.
///
/// Fields are private so both columns always change together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAssignment {
    assignee_id: Option<Uuid>,
    assignee_name: Option<String>,
}

impl TaskAssignment {
    pub fn unassigned() -> Self {
        Self {
            assignee_id: None,
            assignee_name: None,
        }
    }

    pub fn to(user: &user::Model) -> Self {
        Self {
            assignee_id: Some(user.id),
            assignee_name: Some(user.name.clone()),
        }
    }

    pub fn assignee_id(&self) -> Option<Uuid> {
        self.assignee_id
    }

    pub fn apply(self, task: &mut task::ActiveModel) {
        task.assignee_id = Set(self.assignee_id);
        task.assignee_name = Set(self.assignee_name);
    }

    /// Same as [`apply`](Self::apply) for a bulk update.
    pub fn apply_many(self, update: UpdateMany<task::Entity>) -> UpdateMany<task::Entity> {
        update
            .col_expr(task::Column::AssigneeId, Expr::value(self.assignee_id))
            .col_expr(task::Column::AssigneeName, Expr::value(self.assignee_name))
    }
}

/// Task as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskResponse {
    pub id: Uuid,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "estado")]
    pub status: TaskStatus,
    #[serde(rename = "prioridad")]
    pub priority: String,
    #[serde(rename = "usuarioId")]
    pub assignee_id: Option<Uuid>,
    #[serde(rename = "asignadoA")]
    pub assignee_name: Option<String>,
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "creadorId")]
    pub creator_id: Uuid,
    #[serde(rename = "sprintId")]
    pub sprint_id: Option<Uuid>,
    #[serde(rename = "releaseId")]
    pub release_id: Option<Uuid>,
    #[serde(rename = "fechaLimite")]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "etiquetas")]
    pub tags: Vec<TagResponse>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    pub fn new(m: task::Model, tags: Vec<TagResponse>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            status: TaskStatus::parse(&m.status).unwrap_or_default(),
            priority: m.priority,
            assignee_id: m.assignee_id,
            assignee_name: m.assignee_name,
            project_id: m.project_id,
            creator_id: m.creator_id,
            sprint_id: m.sprint_id,
            release_id: m.release_id,
            due_date: m.due_date,
            tags,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTaskRequest {
    #[serde(rename = "titulo")]
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[serde(rename = "descripcion", default)]
    #[validate(length(max = 5000, message = "La descripción es demasiado larga"))]
    pub description: Option<String>,
    #[serde(rename = "estado", default)]
    pub status: Option<TaskStatus>,
    #[serde(rename = "prioridad", default)]
    #[validate(length(min = 1, max = 50, message = "Prioridad inválida"))]
    pub priority: Option<String>,
    #[serde(rename = "usuarioId", default)]
    pub assignee_id: Option<Uuid>,
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "sprintId", default)]
    pub sprint_id: Option<Uuid>,
    #[serde(rename = "releaseId", default)]
    pub release_id: Option<Uuid>,
    #[serde(rename = "fechaLimite", default)]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "etiquetas", default)]
    pub tag_ids: Vec<Uuid>,
}

/// Partial task update. `Some(None)` clears a nullable field.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTaskRequest {
    #[serde(rename = "titulo", default)]
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "double_option")]
    #[validate(length(max = 5000, message = "La descripción es demasiado larga"))]
    pub description: Option<Option<String>>,
    #[serde(rename = "estado", default)]
    pub status: Option<TaskStatus>,
    #[serde(rename = "prioridad", default)]
    #[validate(length(min = 1, max = 50, message = "Prioridad inválida"))]
    pub priority: Option<String>,
    #[serde(rename = "usuarioId", default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(rename = "sprintId", default, deserialize_with = "double_option")]
    pub sprint_id: Option<Option<Uuid>>,
    #[serde(rename = "releaseId", default, deserialize_with = "double_option")]
    pub release_id: Option<Option<Uuid>>,
    #[serde(rename = "fechaLimite", default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateTaskRequest {
    /// Wire names of the fields present in the request body.
    pub fn submitted_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("titulo");
        }
        if self.description.is_some() {
            fields.push("descripcion");
        }
        if self.status.is_some() {
            fields.push("estado");
        }
        if self.priority.is_some() {
            fields.push("prioridad");
        }
        if self.assignee_id.is_some() {
            fields.push("usuarioId");
        }
        if self.sprint_id.is_some() {
            fields.push("sprintId");
        }
        if self.release_id.is_some() {
            fields.push("releaseId");
        }
        if self.due_date.is_some() {
            fields.push("fechaLimite");
        }
        fields
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatusRequest {
    #[serde(rename = "estado")]
    pub status: TaskStatus,
}

/// `usuarioId: null` (or absent) unassigns.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignTaskRequest {
    #[serde(rename = "usuarioId", default)]
    pub assignee_id: Option<Uuid>,
}

/// Filters for `GET /tareas`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    #[serde(rename = "proyectoId", default)]
    pub project_id: Option<Uuid>,
    #[serde(rename = "estado", default)]
    pub status: Option<TaskStatus>,
    #[serde(rename = "usuarioId", default)]
    pub assignee_id: Option<Uuid>,
    #[serde(rename = "sprintId", default)]
    pub sprint_id: Option<Uuid>,
    #[serde(rename = "busqueda", default)]
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    fn sample_user() -> user::Model {
        user::Model {
            id: Uuid::now_v7(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            role: "Empleado".to_string(),
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
        assert_eq!(TaskStatus::parse("Done"), None);
    }

    #[test]
    fn test_assignment_sets_both_columns() {
        let user = sample_user();
        let mut active = task::ActiveModel::default();
        TaskAssignment::to(&user).apply(&mut active);
        assert!(matches!(&active.assignee_id, ActiveValue::Set(Some(id)) if *id == user.id));
        assert!(matches!(&active.assignee_name, ActiveValue::Set(Some(name)) if name == "Ana"));

        TaskAssignment::unassigned().apply(&mut active);
        assert!(matches!(active.assignee_id, ActiveValue::Set(None)));
        assert!(matches!(active.assignee_name, ActiveValue::Set(None)));
    }

    #[test]
    fn test_submitted_fields_tracks_nulls() {
        let req: UpdateTaskRequest = serde_json::from_value(serde_json::json!({
            "titulo": "Nuevo",
            "usuarioId": null
        }))
        .unwrap();
        assert_eq!(req.submitted_fields(), vec!["titulo", "usuarioId"]);
        assert_eq!(req.assignee_id, Some(None));
        assert_eq!(req.description, None);
    }

    #[test]
    fn test_create_task_defaults() {
        let req: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "titulo": "Diseñar login",
            "proyectoId": Uuid::nil()
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.status.is_none());
        assert!(req.tag_ids.is_empty());
    }

    #[test]
    fn test_create_task_rejects_empty_title() {
        let req: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "titulo": "",
            "proyectoId": Uuid::nil()
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_whitespace_title_is_rejected() {
        let req: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "titulo": "   ",
            "proyectoId": Uuid::nil()
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({ "titulo": " \t " })).unwrap();
        assert!(req.validate().is_err());

        let req: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({ "titulo": "  Diseñar login  " })).unwrap();
        assert!(req.validate().is_ok());
        assert!(validate_title(&format!(" {} ", "a".repeat(200))).is_ok());
        assert!(validate_title(&"a".repeat(201)).is_err());
    }

    #[test]
    fn test_update_description_is_bounded() {
        let req: UpdateTaskRequest = serde_json::from_value(serde_json::json!({
            "descripcion": "x".repeat(5001)
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({ "descripcion": null })).unwrap();
        assert!(req.validate().is_ok());

        let req: UpdateTaskRequest = serde_json::from_value(serde_json::json!({
            "descripcion": "x".repeat(5000)
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }
}
