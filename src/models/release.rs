//! Release models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::double_option;
use crate::entity::release;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
pub enum ReleaseStatus {
    #[default]
    #[serde(rename = "Planificada")]
    Planned,
    #[serde(rename = "EnProgreso")]
    InProgress,
    #[serde(rename = "Publicada")]
    Published,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "Planificada",
            Self::InProgress => "EnProgreso",
            Self::Published => "Publicada",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Planificada" => Some(Self::Planned),
            "EnProgreso" => Some(Self::InProgress),
            "Publicada" => Some(Self::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReleaseResponse {
    pub id: Uuid,
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "version")]
    pub version: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "fechaLanzamiento")]
    pub release_date: Option<NaiveDate>,
    #[serde(rename = "estado")]
    pub status: ReleaseStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<release::Model> for ReleaseResponse {
    fn from(m: release::Model) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            name: m.name,
            version: m.version,
            description: m.description,
            release_date: m.release_date,
            status: ReleaseStatus::parse(&m.status).unwrap_or_default(),
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReleaseRequest {
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 100, message = "El nombre debe tener entre 1 y 100 caracteres"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "La versión debe tener entre 1 y 50 caracteres"))]
    pub version: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "fechaLanzamiento", default)]
    pub release_date: Option<NaiveDate>,
    #[serde(rename = "estado", default)]
    pub status: Option<ReleaseStatus>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReleaseRequest {
    #[serde(rename = "nombre", default)]
    #[validate(length(min = 1, max = 100, message = "El nombre debe tener entre 1 y 100 caracteres"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "La versión debe tener entre 1 y 50 caracteres"))]
    pub version: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(rename = "fechaLanzamiento", default, deserialize_with = "double_option")]
    pub release_date: Option<Option<NaiveDate>>,
    #[serde(rename = "estado", default)]
    pub status: Option<ReleaseStatus>,
}

impl UpdateReleaseRequest {
    pub fn submitted_fields(&self) -> Vec<&'static str> {
        [
            ("nombre", self.name.is_some()),
            ("version", self.version.is_some()),
            ("descripcion", self.description.is_some()),
            ("fechaLanzamiento", self.release_date.is_some()),
            ("estado", self.status.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}
