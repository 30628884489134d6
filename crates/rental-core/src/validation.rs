//! # Validation Module
//!
//! Input validation for the rental API.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (rental-api)                                    │
//! │  └── Type validation (JSON deserialization)                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: field rules                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (category name, unit code, e-mail)             │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::{MAX_NAME_LEN, MAX_QUANTITY, MAX_TEXT_LEN, MAX_UNIT_CODE_LEN, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (category, item, renter, user).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 100 characters
///
/// ```rust
/// use rental_core::validation::validate_name;
///
/// assert!(validate_name("name", "Canon EOS R6").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an optional free-text field (description, notes).
pub fn validate_text(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > MAX_TEXT_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a required free-text field (damage description).
pub fn validate_required_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    validate_text(field, Some(value))
}

/// Validates a unit code (the label on the equipment).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ```rust
/// use rental_core::validation::validate_unit_code;
///
/// assert!(validate_unit_code("CAM-001").is_ok());
/// assert!(validate_unit_code("CAM 001").is_err());
/// ```
pub fn validate_unit_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "unit_code".to_string(),
        });
    }

    if code.len() > MAX_UNIT_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "unit_code".to_string(),
            max: MAX_UNIT_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "unit_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - 6 to 20 characters after trimming
/// - Digits, `+`, `-`, and spaces only; at least 6 digits
pub fn validate_phone(field: &str, phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if phone.len() < 6 {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min: 6,
        });
    }

    if phone.len() > 20 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 20,
        });
    }

    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ');
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !allowed || digits < 6 {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a phone number".to_string(),
        });
    }

    Ok(())
}

/// Validates an e-mail address (shape only, no deliverability check).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be an e-mail address".to_string(),
        });
    }

    Ok(())
}

/// Validates a new password before hashing.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Validates a search query. Returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric / Date Validators
// =============================================================================

/// Validates a stock quantity entered by staff.
///
/// ## Rules
/// - Zero is allowed (item exists but nothing in stock)
/// - Must not exceed MAX_QUANTITY
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if !(0..=MAX_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a rental period: the deadline may not precede the rental date.
pub fn validate_rental_period(rental_date: NaiveDate, return_deadline: NaiveDate) -> ValidationResult<()> {
    if return_deadline < rental_date {
        return Err(ValidationError::DateOrder {
            field: "return_deadline".to_string(),
            other: "rental_date".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ```rust
/// use rental_core::validation::validate_uuid;
///
/// assert!(validate_uuid("item_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("item_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
