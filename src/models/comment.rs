use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entity::comment;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    #[serde(rename = "tareaId")]
    pub task_id: Uuid,
    #[serde(rename = "usuarioId")]
    pub author_id: Uuid,
    #[serde(rename = "autor")]
    pub author_name: Option<String>,
    #[serde(rename = "contenido")]
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn new(m: comment::Model, author_name: Option<String>) -> Self {
        Self {
            id: m.id,
            task_id: m.task_id,
            author_id: m.author_id,
            author_name,
            content: m.content,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentRequest {
    #[serde(rename = "tareaId")]
    pub task_id: Uuid,
    #[serde(rename = "contenido")]
    #[validate(length(min = 1, max = 5000, message = "El comentario debe tener entre 1 y 5000 caracteres"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCommentRequest {
    #[serde(rename = "contenido")]
    #[validate(length(min = 1, max = 5000, message = "El comentario debe tener entre 1 y 5000 caracteres"))]
    pub content: String,
}
