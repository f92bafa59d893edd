//! Task attachment models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::attachment;

/// Public download path for a stored file.
pub fn download_url(stored_name: &str) -> String {
    format!("/api/archivos/descargar/{}", urlencoding::encode(stored_name))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttachmentResponse {
    pub id: Uuid,
    #[serde(rename = "tareaId")]
    pub task_id: Uuid,
    #[serde(rename = "usuarioId")]
    pub uploaded_by: Uuid,
    #[serde(rename = "nombreOriginal")]
    pub original_name: String,
    #[serde(rename = "nombreArchivo")]
    pub stored_name: String,
    #[serde(rename = "tipo")]
    pub mime_type: String,
    #[serde(rename = "tamano")]
    pub size_bytes: i64,
    pub url: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<attachment::Model> for AttachmentResponse {
    fn from(m: attachment::Model) -> Self {
        Self {
            url: download_url(&m.stored_name),
            id: m.id,
            task_id: m.task_id,
            uploaded_by: m.uploaded_by,
            original_name: m.original_name,
            stored_name: m.stored_name,
            mime_type: m.mime_type,
            size_bytes: m.size_bytes,
            created_at: m.created_at,
        }
    }
}

/// Aggregate size of a task's attachments.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttachmentList {
    #[serde(rename = "archivos")]
    pub files: Vec<AttachmentResponse>,
    #[serde(rename = "tamanoTotal")]
    pub total_size: i64,
    #[serde(rename = "tamanoMaximo")]
    pub max_total_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_is_encoded() {
        assert_eq!(
            download_url("a b.png"),
            "/api/archivos/descargar/a%20b.png"
        );
    }
}
