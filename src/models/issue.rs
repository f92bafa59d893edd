//! Issue (bug report / feedback) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entity::issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
pub enum IssueKind {
    #[default]
    Error,
    Mejora,
    Pregunta,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Mejora => "Mejora",
            Self::Pregunta => "Pregunta",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Error" => Some(Self::Error),
            "Mejora" => Some(Self::Mejora),
            "Pregunta" => Some(Self::Pregunta),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
pub enum IssueStatus {
    #[default]
    Abierto,
    EnProceso,
    Resuelto,
    Cerrado,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abierto => "Abierto",
            Self::EnProceso => "EnProceso",
            Self::Resuelto => "Resuelto",
            Self::Cerrado => "Cerrado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Abierto" => Some(Self::Abierto),
            "EnProceso" => Some(Self::EnProceso),
            "Resuelto" => Some(Self::Resuelto),
            "Cerrado" => Some(Self::Cerrado),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueResponse {
    pub id: Uuid,
    #[serde(rename = "proyectoId")]
    pub project_id: Option<Uuid>,
    #[serde(rename = "usuarioId")]
    pub reporter_id: Uuid,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "tipo")]
    pub kind: IssueKind,
    #[serde(rename = "estado")]
    pub status: IssueStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<issue::Model> for IssueResponse {
    fn from(m: issue::Model) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            reporter_id: m.reporter_id,
            title: m.title,
            description: m.description,
            kind: IssueKind::parse(&m.kind).unwrap_or_default(),
            status: IssueStatus::parse(&m.status).unwrap_or_default(),
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIssueRequest {
    #[serde(rename = "titulo")]
    #[validate(length(min = 3, max = 200, message = "El título debe tener entre 3 y 200 caracteres"))]
    pub title: String,
    #[serde(rename = "descripcion")]
    #[validate(length(min = 1, max = 5000, message = "La descripción es obligatoria"))]
    pub description: String,
    #[serde(rename = "tipo", default)]
    pub kind: Option<IssueKind>,
    #[serde(rename = "proyectoId", default)]
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateIssueStatusRequest {
    #[serde(rename = "estado")]
    pub status: IssueStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueListQuery {
    #[serde(rename = "estado", default)]
    pub status: Option<IssueStatus>,
    #[serde(rename = "tipo", default)]
    pub kind: Option<IssueKind>,
}
