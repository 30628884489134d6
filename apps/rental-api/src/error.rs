//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Rental API                         │
//! │                                                                         │
//! │  Handler ──► Repository ──► DbError ─────────┐                          │
//! │                  │                           │                          │
//! │                  └──► CoreError (Domain) ────┤                          │
//! │                          │                   ▼                          │
//! │                          └──► ValidationError ──► ApiError ──► JSON     │
//! │                                                                         │
//! │  { "code": "BUSINESS_RULE", "message": "Loan ... is Returned, ..." }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Database faults are logged in full and answered with a generic message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rental_core::{CoreError, ValidationError};
use rental_db::DbError;
use serde::Serialize;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error body returned to the frontend.
///
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "renter_phone is required",
///   "field": "renter_phone"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Form field the error belongs to, for inline display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (422)
    ValidationError,

    /// Request body or query could not be read (400)
    BadRequest,

    /// A business rule refused the operation (409)
    BusinessRule,

    /// Concurrent modification, safe to retry (409)
    Conflict,

    /// Database operation failed (500)
    DatabaseError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::BusinessRule | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            field: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error attached to a form field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            code: ErrorCode::ValidationError,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a business rule error.
    pub fn business_rule(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BusinessRule, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                let message = format!("{} '{}' already exists", field, value);
                ApiError::validation(field, message)
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::business_rule(format!("Record is still in use: {}", message))
            }
            DbError::Conflict { entity, id } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} {} was changed by another request, please retry", entity, id),
            ),
            DbError::Domain(core) => ApiError::from(core),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::from(e),
            // Renting an empty or held item is reported against the form field
            e @ CoreError::ItemUnavailable { .. } => ApiError::validation("item_id", e.to_string()),
            e @ CoreError::UnitItemMismatch { .. } => {
                ApiError::validation("item_unit_id", e.to_string())
            }
            e @ (CoreError::ItemAlreadyHeld { .. }
            | CoreError::LoanNotActive { .. }
            | CoreError::InvalidReportTransition { .. }
            | CoreError::UnitUnavailable { .. }) => ApiError::business_rule(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::BadRequest, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(ErrorCode::BadRequest, rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_core::{ItemStatus, LoanStatus, ReportStatus};

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_value(ApiError::not_found("Loan", "abc")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Loan not found: abc");
        assert!(json.get("field").is_none());
    }

    #[test]
    fn test_unavailable_item_is_a_form_error() {
        let err = ApiError::from(DbError::Domain(CoreError::ItemUnavailable {
            item_id: "i".to_string(),
            name: "Tripod".to_string(),
            status: ItemStatus::Unavailable,
            quantity: 0,
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("item_id"));
        assert_eq!(err.code.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_business_rules_are_conflicts() {
        let err = ApiError::from(CoreError::LoanNotActive {
            loan_id: "l".to_string(),
            status: LoanStatus::Returned,
            operation: "return",
        });
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert_eq!(err.code.status(), StatusCode::CONFLICT);

        let err = ApiError::from(CoreError::InvalidReportTransition {
            report_id: "r".to_string(),
            from: ReportStatus::Reported,
            to: ReportStatus::Repaired,
        });
        assert_eq!(err.code, ErrorCode::BusinessRule);
    }

    #[test]
    fn test_database_faults_are_generic() {
        let err = ApiError::from(DbError::QueryFailed("no such table: loans".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");

        let err = ApiError::from(DbError::conflict("Item", "i"));
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_unique_violation_names_field() {
        let err = ApiError::from(DbError::duplicate("unit_code", "CAM-001"));
        assert_eq!(err.field.as_deref(), Some("unit_code"));
        assert_eq!(err.message, "unit_code 'CAM-001' already exists");
    }
}
