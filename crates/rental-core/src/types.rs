//! # Domain Types
//!
//! Core domain types used throughout the rental back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │◄──│      Item       │◄──│    ItemUnit     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name (unique)  │   │  quantity       │   │  unit_code      │       │
//! │  └─────────────────┘   │  status         │   │  status         │       │
//! │                        │  version        │   └─────────────────┘       │
//! │                        └────────┬────────┘                              │
//! │                    ┌────────────┴────────────┐                          │
//! │           ┌────────┴────────┐      ┌─────────┴─────────┐                │
//! │           │      Loan       │      │ BrokenItemReport  │                │
//! │           │  Active         │      │  Reported → ...   │                │
//! │           │  Returned       │      │  → Repaired       │                │
//! │           │  Cancelled      │      │  → Rejected       │                │
//! │           └─────────────────┘      └───────────────────┘                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity is keyed by a UUID v4 string. Units additionally carry a
//! human-readable `unit_code` (the label stuck on the equipment).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Category
// =============================================================================

/// A grouping of items (e.g., "Cameras", "Audio").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Item Status
// =============================================================================

/// Availability of an item type as a whole.
///
/// Never set directly: always derived through [`ItemStatus::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// At least one unit of stock can be rented.
    Available,
    /// Stock is exhausted.
    Unavailable,
    /// An open damage report holds the item out of circulation.
    Held,
}

impl ItemStatus {
    /// Derives the status from the stock level and the hold flag.
    ///
    /// ```rust
    /// use rental_core::ItemStatus;
    ///
    /// assert_eq!(ItemStatus::derive(3, false), ItemStatus::Available);
    /// assert_eq!(ItemStatus::derive(0, false), ItemStatus::Unavailable);
    /// assert_eq!(ItemStatus::derive(3, true), ItemStatus::Held);
    /// ```
    pub fn derive(quantity: i64, held: bool) -> Self {
        if held {
            ItemStatus::Held
        } else if quantity > 0 {
            ItemStatus::Available
        } else {
            ItemStatus::Unavailable
        }
    }
}

// =============================================================================
// Item
// =============================================================================

/// A rentable equipment type with an aggregate stock count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Units currently in the pool. Never negative.
    pub quantity: i64,
    pub status: ItemStatus,
    /// Bumped on every stock write; stock updates are compared against it.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Whether an open damage report currently holds this item.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.status == ItemStatus::Held
    }

    /// Whether one unit can be taken out of the pool for a loan.
    pub fn can_rent(&self) -> bool {
        self.status == ItemStatus::Available && self.quantity > 0
    }
}

// =============================================================================
// Item Unit
// =============================================================================

/// Condition of an individually tracked unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Available,
    /// Withdrawn by staff (lost, retired, reserved).
    Unavailable,
    Damaged,
    InRepair,
    Loaned,
}

impl Default for UnitStatus {
    fn default() -> Self {
        UnitStatus::Available
    }
}

/// A physical instance of an item, labelled with a unique code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ItemUnit {
    pub id: String,
    pub item_id: String,
    pub unit_code: String,
    pub status: UnitStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Loan
// =============================================================================

/// The status of a rental record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Equipment is out with the renter.
    Active,
    /// Equipment came back.
    Returned,
    /// Loan was called off; stock was put back without a return.
    Cancelled,
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Active
    }
}

/// A rental record linking a renter to an item for a period.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Loan {
    pub id: String,
    pub renter_name: String,
    pub renter_phone: String,
    pub item_id: String,
    /// Specific unit handed out, when the item is tracked per unit.
    pub item_unit_id: Option<String>,
    #[ts(as = "String")]
    pub rental_date: NaiveDate,
    #[ts(as = "String")]
    pub return_deadline: NaiveDate,
    #[ts(as = "Option<String>")]
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Broken Item Report
// =============================================================================

/// Position of a damage report in the repair workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Reported,
    RepairRequested,
    InRepair,
    Repaired,
    Rejected,
}

impl Default for ReportStatus {
    fn default() -> Self {
        ReportStatus::Reported
    }
}

/// A damage report against an item (and optionally one of its units).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BrokenItemReport {
    pub id: String,
    pub item_id: String,
    pub item_unit_id: Option<String>,
    pub reporter_id: String,
    pub description: String,
    /// Path of the uploaded proof photo; storage is handled elsewhere.
    pub proof_image_path: Option<String>,
    pub status: ReportStatus,
    pub repair_notes: Option<String>,
    pub repair_requester_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub repair_requested_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Users
// =============================================================================

/// Staff role. Admins and technicians review damage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Staff,
    Technician,
}

impl UserRole {
    /// Roles notified when damage is reported.
    pub const REVIEWERS: [UserRole; 2] = [UserRole::Admin, UserRole::Technician];
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Staff
    }
}

/// A member of staff.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new damage report needs review.
    ReportFiled,
    /// A report the recipient filed or requested repair on has moved.
    ReportStatusChanged,
}

/// A stored notification for one user.
///
/// Written in the same transaction as the change that triggered it, so a
/// rolled-back change never leaves a notification behind.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    /// Entity type the notification points at, e.g. "broken_item_report".
    pub subject_type: String,
    pub subject_id: String,
    pub message: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub read_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, status: ItemStatus) -> Item {
        Item {
            id: "item-1".to_string(),
            category_id: "cat-1".to_string(),
            name: "Tripod".to_string(),
            description: None,
            quantity,
            status,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_item_status_derived_from_quantity() {
        for quantity in 0..5 {
            let expected = if quantity > 0 {
                ItemStatus::Available
            } else {
                ItemStatus::Unavailable
            };
            assert_eq!(ItemStatus::derive(quantity, false), expected);
            assert_eq!(ItemStatus::derive(quantity, true), ItemStatus::Held);
        }
    }

    #[test]
    fn test_can_rent() {
        assert!(item(2, ItemStatus::Available).can_rent());
        assert!(!item(0, ItemStatus::Unavailable).can_rent());
        assert!(!item(2, ItemStatus::Held).can_rent());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ReportStatus::RepairRequested).unwrap(),
            "\"repair_requested\""
        );
        assert_eq!(serde_json::to_string(&UnitStatus::InRepair).unwrap(), "\"in_repair\"");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: "u-1".to_string(),
            name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
            phone: None,
            role: UserRole::Admin,
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
    }
}
