//! User models, roles and authentication DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Global user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
pub enum Role {
    #[serde(rename = "Administrador")]
    Administrator,
    #[default]
    #[serde(rename = "Empleado")]
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "Administrador",
            Self::Employee => "Empleado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Administrador" => Some(Self::Administrator),
            "Empleado" => Some(Self::Employee),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity attached to a request by the bearer-token extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    /// Check if the caller has the administrator role.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Administrator)
    }
}

/// Access token JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    pub role: String,
}

/// User as returned by the API. Never carries credentials.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::user::Model> for UserResponse {
    fn from(m: crate::entity::user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            role: Role::parse(&m.role).unwrap_or_default(),
            created_at: m.created_at,
        }
    }
}

/// Request to create a user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[serde(rename = "nombre")]
    #[validate(length(min = 2, max = 150, message = "El nombre debe tener entre 2 y 150 caracteres"))]
    pub name: String,
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "La contraseña debe tener al menos 8 caracteres"))]
    pub password: String,
    #[serde(rename = "rol", default)]
    pub role: Option<Role>,
}

/// Request to update a user. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(rename = "nombre", default)]
    #[validate(length(min = 2, max = 150, message = "El nombre debe tener entre 2 y 150 caracteres"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "La contraseña debe tener al menos 8 caracteres"))]
    pub password: Option<String>,
    #[serde(rename = "rol", default)]
    pub role: Option<Role>,
}

/// Filters for the user directory. Paging is read separately.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    #[serde(rename = "busqueda", default)]
    pub search: Option<String>,
    #[serde(rename = "rol", default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[validate(length(min = 1, message = "La contraseña es obligatoria"))]
    pub password: String,
}

/// Issued token pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
    #[serde(rename = "usuario")]
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    #[validate(length(min = 1, message = "El token es obligatorio"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Email inválido"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "El token es obligatorio"))]
    pub token: String,
    #[validate(length(min = 8, max = 128, message = "La contraseña debe tener al menos 8 caracteres"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Administrator, Role::Employee] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(
            serde_json::to_value(Role::Administrator).unwrap(),
            "Administrador"
        );
        let role: Role = serde_json::from_str("\"Empleado\"").unwrap();
        assert_eq!(role, Role::Employee);
    }

    #[test]
    fn test_create_user_validation() {
        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "nombre": "A",
            "email": "not-an-email",
            "password": "short"
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 3);
    }
}
