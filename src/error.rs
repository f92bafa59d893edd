//! Domain error types for Tablero.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use utoipa::ToSchema;

/// Whether internal error text is echoed to clients (development only).
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Enable or disable `details.debug` on 5xx responses.
pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::Relaxed);
}

/// One rejected input field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request body failed schema validation
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unique constraint or state conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload exceeds a size limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// External service (GitHub, SMTP) failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Local file storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Client exceeded its request budget; carries seconds until reset
    #[error("Too many requests")]
    TooManyRequests(u64),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message, details) = match self {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                (
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                    debug_details(err_str),
                )
            }
            AppError::Storage(err_str) => {
                tracing::error!("Storage error: {}", err_str);
                (
                    "STORAGE_ERROR",
                    "File storage failed".to_string(),
                    debug_details(err_str),
                )
            }
            AppError::NotFound(_) => ("NOT_FOUND", self.to_string(), None),
            AppError::InvalidInput(_) => ("INVALID_INPUT", self.to_string(), None),
            AppError::Validation(fields) => (
                "VALIDATION_ERROR",
                "Los datos enviados no son válidos".to_string(),
                serde_json::to_value(fields).ok(),
            ),
            AppError::Unauthorized(_) => ("UNAUTHORIZED", self.to_string(), None),
            AppError::Forbidden(_) => ("FORBIDDEN", self.to_string(), None),
            AppError::Conflict(_) => ("CONFLICT", self.to_string(), None),
            AppError::PayloadTooLarge(_) => ("PAYLOAD_TOO_LARGE", self.to_string(), None),
            AppError::Upstream(err_str) => {
                tracing::warn!("Upstream error: {}", err_str);
                ("UPSTREAM_ERROR", self.to_string(), None)
            }
            AppError::TooManyRequests(_) => (
                "TOO_MANY_REQUESTS",
                "Demasiadas solicitudes, intente más tarde".to_string(),
                None,
            ),
        };

        let mut builder = HttpResponse::build(self.status_code());
        if let AppError::TooManyRequests(retry_after) = self {
            builder.insert_header(("Retry-After", retry_after.to_string()));
        }
        builder.json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        })
    }
}

fn debug_details(internal: &str) -> Option<serde_json::Value> {
    if EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
        Some(serde_json::json!({ "debug": internal }))
    } else {
        None
    }
}

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::debug!("Unique constraint violation: {}", detail);
                return AppError::Conflict("El registro ya existe".to_string());
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                tracing::debug!("Foreign key violation: {}", detail);
                return AppError::InvalidInput("Referencia a un registro inexistente".to_string());
            }
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(what) => AppError::NotFound(what),
            DbErr::RecordNotUpdated => AppError::NotFound("Record".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid UUID: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "requerido"))]
        titulo: String,
        #[validate(range(min = 1, max = 100))]
        limite: u32,
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound("Tarea".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Validation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_validation_errors_become_field_list() {
        let sample = Sample {
            titulo: String::new(),
            limite: 500,
        };
        let err: AppError = sample.validate().unwrap_err().into();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].field, "limite");
                assert_eq!(fields[1].field, "titulo");
                assert_eq!(fields[1].message, "requerido");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_record_not_found_maps_to_404() {
        let err: AppError = DbErr::RecordNotFound("Proyecto".to_string()).into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_too_many_requests_sets_retry_after() {
        let resp = AppError::TooManyRequests(42).error_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get("Retry-After").unwrap(), "42");
    }

    #[test]
    fn test_generic_db_error_is_500() {
        let err: AppError = DbErr::Custom("boom".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
