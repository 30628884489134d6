//! # Write Inputs
//!
//! Payloads for every create/update operation, with their field rules.
//!
//! The HTTP layer deserializes requests straight into these types and the
//! database layer calls `validate()` before touching any row, so a payload
//! is checked the same way no matter which entry point it came through.
//!
//! Update payloads use `Option` for "leave unchanged". Nullable columns use
//! `Option<Option<_>>`: absent keeps the value, `null` clears it.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::types::{ReportStatus, UnitStatus, UserRole};
use crate::validation::{
    validate_email, validate_name, validate_password, validate_phone, validate_rental_period,
    validate_required_text, validate_stock_quantity, validate_text, validate_unit_code,
    validate_uuid, ValidationResult,
};

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewCategory {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_text("description", self.description.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub description: Option<Option<String>>,
}

impl CategoryChanges {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        validate_text("description", self.description.as_ref().and_then(|d| d.as_deref()))
    }
}

// =============================================================================
// Items
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewItem {
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: i64,
}

impl NewItem {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("category_id", &self.category_id)?;
        validate_name("name", &self.name)?;
        validate_text("description", self.description.as_deref())?;
        validate_stock_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemChanges {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub description: Option<Option<String>>,
    /// Absolute stock correction. Status is re-derived, holds are kept.
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl ItemChanges {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(category_id) = &self.category_id {
            validate_uuid("category_id", category_id)?;
        }
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        validate_text("description", self.description.as_ref().and_then(|d| d.as_deref()))?;
        if let Some(quantity) = self.quantity {
            validate_stock_quantity(quantity)?;
        }
        Ok(())
    }
}

// =============================================================================
// Units
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUnit {
    pub unit_code: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewUnit {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_unit_code(&self.unit_code)?;
        validate_text("notes", self.notes.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitChanges {
    #[serde(default)]
    pub unit_code: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub notes: Option<Option<String>>,
    /// Only Available/Unavailable may be set by hand.
    #[serde(default)]
    pub status: Option<UnitStatus>,
}

impl UnitChanges {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(code) = &self.unit_code {
            validate_unit_code(code)?;
        }
        validate_text("notes", self.notes.as_ref().and_then(|n| n.as_deref()))
    }
}

// =============================================================================
// Loans
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLoan {
    pub renter_name: String,
    pub renter_phone: String,
    pub item_id: String,
    #[serde(default)]
    pub item_unit_id: Option<String>,
    #[ts(as = "String")]
    pub rental_date: NaiveDate,
    #[ts(as = "String")]
    pub return_deadline: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewLoan {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("renter_name", &self.renter_name)?;
        validate_phone("renter_phone", &self.renter_phone)?;
        validate_uuid("item_id", &self.item_id)?;
        if let Some(unit_id) = &self.item_unit_id {
            validate_uuid("item_unit_id", unit_id)?;
        }
        validate_rental_period(self.rental_date, self.return_deadline)?;
        validate_text("notes", self.notes.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoanChanges {
    #[serde(default)]
    pub renter_name: Option<String>,
    #[serde(default)]
    pub renter_phone: Option<String>,
    /// Moving an active loan to another item reconciles both items' stock.
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub item_unit_id: Option<Option<String>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub rental_date: Option<NaiveDate>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub return_deadline: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub notes: Option<Option<String>>,
}

impl LoanChanges {
    /// Field-level checks; the date order is checked against the merged loan.
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.renter_name {
            validate_name("renter_name", name)?;
        }
        if let Some(phone) = &self.renter_phone {
            validate_phone("renter_phone", phone)?;
        }
        if let Some(item_id) = &self.item_id {
            validate_uuid("item_id", item_id)?;
        }
        if let Some(Some(unit_id)) = &self.item_unit_id {
            validate_uuid("item_unit_id", unit_id)?;
        }
        validate_text("notes", self.notes.as_ref().and_then(|n| n.as_deref()))
    }
}

// =============================================================================
// Damage Reports
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewReport {
    pub item_id: String,
    #[serde(default)]
    pub item_unit_id: Option<String>,
    pub reporter_id: String,
    pub description: String,
    #[serde(default)]
    pub proof_image_path: Option<String>,
}

impl NewReport {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("item_id", &self.item_id)?;
        if let Some(unit_id) = &self.item_unit_id {
            validate_uuid("item_unit_id", unit_id)?;
        }
        validate_uuid("reporter_id", &self.reporter_id)?;
        validate_required_text("description", &self.description)?;
        validate_text("proof_image_path", self.proof_image_path.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportTransition {
    pub status: ReportStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Staff member performing the transition. Recorded as the repair
    /// requester when moving to RepairRequested.
    #[serde(default)]
    pub actor_id: Option<String>,
}

impl ReportTransition {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(actor_id) = &self.actor_id {
            validate_uuid("actor_id", actor_id)?;
        }
        if self.status == ReportStatus::RepairRequested && self.actor_id.is_none() {
            return Err(crate::ValidationError::Required {
                field: "actor_id".to_string(),
            });
        }
        validate_text("notes", self.notes.as_deref())
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_email(&self.email)?;
        if let Some(phone) = &self.phone {
            validate_phone("phone", phone)?;
        }
        validate_password(&self.password)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub phone: Option<Option<String>>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl UserChanges {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(Some(phone)) = &self.phone {
            validate_phone("phone", phone)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_new_loan_validation() {
        let loan: NewLoan = serde_json::from_value(serde_json::json!({
            "renter_name": "Ayu",
            "renter_phone": "081234567",
            "item_id": ITEM_ID,
            "rental_date": "2026-04-01",
            "return_deadline": "2026-04-03"
        }))
        .unwrap();
        assert!(loan.validate().is_ok());

        let backwards = NewLoan {
            return_deadline: NaiveDate::from_ymd_opt(2026, 3, 30).unwrap(),
            ..loan.clone()
        };
        assert_eq!(backwards.validate().unwrap_err().field(), "return_deadline");

        let nameless = NewLoan {
            renter_name: " ".to_string(),
            ..loan
        };
        assert_eq!(nameless.validate().unwrap_err().field(), "renter_name");
    }

    #[test]
    fn test_double_option_distinguishes_null() {
        let absent: ItemChanges = serde_json::from_str("{}").unwrap();
        assert!(absent.description.is_none());

        let cleared: ItemChanges = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: ItemChanges = serde_json::from_str(r#"{"description": "HDMI"}"#).unwrap();
        assert_eq!(set.description, Some(Some("HDMI".to_string())));
    }

    #[test]
    fn test_repair_request_needs_actor() {
        let transition = ReportTransition {
            status: ReportStatus::RepairRequested,
            notes: None,
            actor_id: None,
        };
        assert_eq!(transition.validate().unwrap_err().field(), "actor_id");

        let transition = ReportTransition {
            actor_id: Some(ITEM_ID.to_string()),
            ..transition
        };
        assert!(transition.validate().is_ok());
    }

    #[test]
    fn test_new_user_defaults_to_staff() {
        let user: NewUser = serde_json::from_value(serde_json::json!({
            "name": "Budi",
            "email": "budi@rental.test",
            "password": "longenough"
        }))
        .unwrap();
        assert_eq!(user.role, UserRole::Staff);
        assert!(user.validate().is_ok());
    }
}
