//! Project and membership models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::double_option;
use super::user::Role;
use crate::entity::{project, user};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "creadorId")]
    pub creator_id: Uuid,
    #[serde(rename = "gerenteId")]
    pub manager_id: Uuid,
    #[serde(rename = "fechaInicio")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fechaFin")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<project::Model> for ProjectResponse {
    fn from(m: project::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            creator_id: m.creator_id,
            manager_id: m.manager_id,
            start_date: m.start_date,
            end_date: m.end_date,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProjectRequest {
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 150, message = "El nombre debe tener entre 1 y 150 caracteres"))]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    #[validate(length(max = 5000, message = "La descripción es demasiado larga"))]
    pub description: Option<String>,
    /// Defaults to the creator.
    #[serde(rename = "gerenteId", default)]
    pub manager_id: Option<Uuid>,
    #[serde(rename = "fechaInicio", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fechaFin", default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProjectRequest {
    #[serde(rename = "nombre", default)]
    #[validate(length(min = 1, max = 150, message = "El nombre debe tener entre 1 y 150 caracteres"))]
    pub name: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(rename = "gerenteId", default)]
    pub manager_id: Option<Uuid>,
    #[serde(rename = "fechaInicio", default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(rename = "fechaFin", default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
}

impl UpdateProjectRequest {
    pub fn submitted_fields(&self) -> Vec<&'static str> {
        [
            ("nombre", self.name.is_some()),
            ("descripcion", self.description.is_some()),
            ("gerenteId", self.manager_id.is_some()),
            ("fechaInicio", self.start_date.is_some()),
            ("fechaFin", self.end_date.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    #[serde(rename = "usuarioId")]
    pub user_id: Uuid,
}

/// One row of the membership union.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberResponse {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "esCreador")]
    pub is_creator: bool,
    #[serde(rename = "esGerente")]
    pub is_manager: bool,
}

impl MemberResponse {
    pub fn new(user: user::Model, project: &project::Model) -> Self {
        Self {
            is_creator: user.id == project.creator_id,
            is_manager: user.id == project.manager_id,
            id: user.id,
            name: user.name,
            email: user.email,
            role: Role::parse(&user.role).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitted_fields() {
        let req: UpdateProjectRequest = serde_json::from_value(serde_json::json!({
            "nombre": "Portal",
            "fechaFin": null
        }))
        .unwrap();
        assert_eq!(req.submitted_fields(), vec!["nombre", "fechaFin"]);
    }

    #[test]
    fn test_create_requires_name() {
        let req: CreateProjectRequest =
            serde_json::from_value(serde_json::json!({ "nombre": "" })).unwrap();
        assert!(req.validate().is_err());
    }
}
