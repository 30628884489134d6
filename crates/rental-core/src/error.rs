//! # Error Types
//!
//! Domain-specific error types for rental-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rental-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  rental-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP errors (in rental-api)                                           │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::{ItemStatus, LoanStatus, ReportStatus, UnitStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledger and the state machines.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Item cannot be taken out of the pool.
    ///
    /// ## When This Occurs
    /// - Renting an item whose quantity is zero
    /// - Renting an item that is held by an open damage report
    /// - Reporting damage on an item with nothing left in the pool
    #[error("Item '{name}' is not available (status {status:?}, quantity {quantity})")]
    ItemUnavailable {
        item_id: String,
        name: String,
        status: ItemStatus,
        quantity: i64,
    },

    /// Item already has an open damage report.
    #[error("Item '{name}' already has an open damage report")]
    ItemAlreadyHeld { item_id: String, name: String },

    /// Loan is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Returning a loan that was already returned
    /// - Cancelling a returned loan
    /// - Moving a closed loan to another item
    #[error("Loan {loan_id} is {status:?}, cannot {operation}")]
    LoanNotActive {
        loan_id: String,
        status: LoanStatus,
        operation: &'static str,
    },

    /// Damage report transition is not allowed by the workflow.
    #[error("Report {report_id} cannot move from {from:?} to {to:?}")]
    InvalidReportTransition {
        report_id: String,
        from: ReportStatus,
        to: ReportStatus,
    },

    /// Unit cannot be used for the requested operation.
    #[error("Unit {unit_code} is {status:?}")]
    UnitUnavailable { unit_code: String, status: UnitStatus },

    /// Unit belongs to a different item than the one referenced.
    #[error("Unit {unit_code} does not belong to item {item_id}")]
    UnitItemMismatch { unit_code: String, item_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs. Each variant names the offending
/// field so the frontend can show the message next to the input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, invalid phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// One date must not precede another.
    #[error("{field} must not be before {other}")]
    DateOrder { field: String, other: String },
}

impl ValidationError {
    /// Returns the name of the field this error is about.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::DateOrder { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::ItemUnavailable {
            item_id: "i-1".to_string(),
            name: "Projector".to_string(),
            status: ItemStatus::Unavailable,
            quantity: 0,
        };
        assert_eq!(
            err.to_string(),
            "Item 'Projector' is not available (status Unavailable, quantity 0)"
        );

        let err = CoreError::LoanNotActive {
            loan_id: "l-1".to_string(),
            status: LoanStatus::Returned,
            operation: "return",
        };
        assert_eq!(err.to_string(), "Loan l-1 is Returned, cannot return");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "renter_name".to_string(),
        };
        assert_eq!(err.to_string(), "renter_name is required");

        let err = ValidationError::DateOrder {
            field: "return_deadline".to_string(),
            other: "rental_date".to_string(),
        };
        assert_eq!(err.to_string(), "return_deadline must not be before rental_date");
        assert_eq!(err.field(), "return_deadline");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
