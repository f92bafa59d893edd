//! Domain models and wire DTOs for the Tablero API.
//!
//! Rust names are English; the JSON field names follow the public API
//! (`titulo`, `estado`, `usuarioId`, ...).

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult, FieldError};

pub mod activity;
pub mod attachment;
pub mod comment;
pub mod github;
pub mod issue;
pub mod notification;
pub mod project;
pub mod release;
pub mod sprint;
pub mod stats;
pub mod tag;
pub mod task;
pub mod user;

// Re-export commonly used types
pub use activity::{ActivityAction, EntityKind, EntityRef, FieldChange, NewActivity};
pub use notification::{NotificationDraft, NotificationKind};
pub use task::{TaskAssignment, TaskStatus};
pub use user::{AuthenticatedUser, Role};

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Pagination parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PaginationParams {
    /// Page number, at least 1.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Clamp limit to 1..=100.
    pub fn clamped_limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Calculate the offset for database queries. Saturates at the largest
    /// offset PostgreSQL accepts, which simply yields an empty page.
    pub fn offset(&self) -> u64 {
        (self.page() - 1)
            .saturating_mul(self.clamped_limit())
            .min(i64::MAX as u64)
    }

    /// Build response metadata for a result set of `total` rows.
    pub fn paginate(&self, total: u64) -> Pagination {
        Pagination::new(self.page(), self.clamped_limit(), total)
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
    #[serde(rename = "hasPrevious")]
    pub has_previous: bool,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit.max(1));

        Pagination {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

/// Paginated list envelope.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Success envelope: `{ message, ...data }`.
#[derive(Debug, Serialize)]
pub struct MessageResponse<T: Serialize> {
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> MessageResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Distinguish "field absent" (`None`) from "field set to null" (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reject ranges whose end precedes their start.
pub fn validate_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    end_field: &str,
) -> AppResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(AppError::Validation(vec![FieldError {
            field: end_field.to_string(),
            message: "La fecha de fin no puede ser anterior a la de inicio".to_string(),
        }])),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<u64>, limit: Option<u64>) -> PaginationParams {
        PaginationParams { page, limit }
    }

    #[test]
    fn test_defaults() {
        let p = params(None, None);
        assert_eq!(p.page(), 1);
        assert_eq!(p.clamped_limit(), 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_limit_is_clamped_to_100() {
        assert_eq!(params(None, Some(500)).clamped_limit(), 100);
        assert_eq!(params(None, Some(0)).clamped_limit(), 1);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let p = params(Some(0), Some(10));
        assert_eq!(p.page(), 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_huge_page_saturates_offset() {
        let p = params(Some(u64::MAX), Some(100));
        assert_eq!(p.offset(), i64::MAX as u64);
        assert!(!p.paginate(5).has_next);

        assert_eq!(params(Some(3), Some(100)).offset(), 200);
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        for (total, limit, expected) in [(0, 20, 0), (1, 20, 1), (20, 20, 1), (21, 20, 2), (99, 10, 10)] {
            assert_eq!(Pagination::new(1, limit, total).total_pages, expected);
        }
    }

    #[test]
    fn test_has_next_and_previous() {
        let first = Pagination::new(1, 10, 25);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = Pagination::new(3, 10, 25);
        assert!(!last.has_next);
        assert!(last.has_previous);

        let empty = Pagination::new(1, 10, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_pagination_wire_names() {
        let json = serde_json::to_value(Pagination::new(2, 10, 25)).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["hasNext"], true);
        assert_eq!(json["hasPrevious"], true);
    }

    #[test]
    fn test_date_range() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        assert!(validate_date_range(d("2026-01-01"), d("2026-01-01"), "fechaFin").is_ok());
        assert!(validate_date_range(d("2026-01-02"), d("2026-01-01"), "fechaFin").is_err());
        assert!(validate_date_range(None, d("2026-01-01"), "fechaFin").is_ok());
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        value: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.value, None);

        let null: Patch = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert_eq!(null.value, Some(None));

        let set: Patch = serde_json::from_str(r#"{"value": "x"}"#).unwrap();
        assert_eq!(set.value, Some(Some("x".to_string())));
    }
}
