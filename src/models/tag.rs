//! Tag catalogue models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const DEFAULT_TAG_COLOR: &str = "#6B7280";

/// Accepts `#RGB` or `#RRGGBB`.
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let hex = color
        .strip_prefix('#')
        .ok_or_else(|| ValidationError::new("color").with_message("Color hexadecimal inválido".into()))?;
    if matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::new("color").with_message("Color hexadecimal inválido".into()))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagResponse {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    pub color: String,
    #[serde(rename = "creadoPor")]
    pub created_by: Uuid,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::tag::Model> for TagResponse {
    fn from(m: crate::entity::tag::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            color: m.color,
            created_by: m.created_by,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTagRequest {
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 50, message = "El nombre debe tener entre 1 y 50 caracteres"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTagRequest {
    #[serde(rename = "nombre", default)]
    #[validate(length(min = 1, max = 50, message = "El nombre debe tener entre 1 y 50 caracteres"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        assert!(validate_hex_color("#fff").is_ok());
        assert!(validate_hex_color("#1A2b3C").is_ok());
        assert!(validate_hex_color("1A2b3C").is_err());
        assert!(validate_hex_color("#12345").is_err());
        assert!(validate_hex_color("#ggg").is_err());
    }

    #[test]
    fn test_create_tag_rejects_bad_color() {
        let req: CreateTagRequest =
            serde_json::from_value(serde_json::json!({"nombre": "bug", "color": "red"})).unwrap();
        assert!(req.validate().is_err());

        let req: CreateTagRequest =
            serde_json::from_value(serde_json::json!({"nombre": "bug"})).unwrap();
        assert!(req.validate().is_ok());
    }
}
