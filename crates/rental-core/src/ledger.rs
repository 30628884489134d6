//! # Inventory Ledger
//!
//! Stock bookkeeping rules for items and units.
//!
//! ## How Stock Moves
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Item Stock Movements                              │
//! │                                                                         │
//! │   loan created ──────► take_one ─────► quantity - 1, status derived     │
//! │   loan returned ─────► put_back ─────► quantity + 1, status derived     │
//! │   loan cancelled ────► put_back                                         │
//! │                                                                         │
//! │   damage reported ───► hold ─────────► quantity - 1, status Held        │
//! │   report resolved ───► release ──────► quantity + 1, hold cleared       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rule returns a [`StockChange`] instead of mutating the item. The
//! change carries the version it was computed from; the database layer
//! writes it only if the row still has that version, so two requests racing
//! on the same item can never both take the last unit.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Item, ItemStatus, ItemUnit, ReportStatus, UnitStatus};

/// A new stock level for one item, computed from a snapshot of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub item_id: String,
    /// The `version` of the snapshot this change was computed from.
    pub expected_version: i64,
    pub quantity: i64,
    pub status: ItemStatus,
}

impl StockChange {
    fn from_item(item: &Item, quantity: i64, held: bool) -> Self {
        StockChange {
            item_id: item.id.clone(),
            expected_version: item.version,
            quantity,
            status: ItemStatus::derive(quantity, held),
        }
    }

    /// Applies the change to an in-memory copy (after it was persisted).
    pub fn apply_to(&self, item: &mut Item) {
        item.quantity = self.quantity;
        item.status = self.status;
        item.version = self.expected_version + 1;
    }
}

// =============================================================================
// Item Rules
// =============================================================================

/// Takes one unit out of the pool for a loan.
///
/// ## Errors
/// [`CoreError::ItemUnavailable`] if the item is held or its quantity is zero.
pub fn take_one(item: &Item) -> CoreResult<StockChange> {
    if !item.can_rent() {
        return Err(unavailable(item));
    }
    Ok(StockChange::from_item(item, item.quantity - 1, false))
}

/// Puts one unit back into the pool. An existing hold is kept.
pub fn put_back(item: &Item) -> StockChange {
    StockChange::from_item(item, item.quantity + 1, item.is_held())
}

/// Pulls one unit out of the pool for a damage report and holds the item.
///
/// ## Errors
/// - [`CoreError::ItemAlreadyHeld`] if another report already holds it
/// - [`CoreError::ItemUnavailable`] if nothing is left in the pool
pub fn hold(item: &Item) -> CoreResult<StockChange> {
    if item.is_held() {
        return Err(CoreError::ItemAlreadyHeld {
            item_id: item.id.clone(),
            name: item.name.clone(),
        });
    }
    if item.quantity <= 0 {
        return Err(unavailable(item));
    }
    Ok(StockChange::from_item(item, item.quantity - 1, true))
}

/// Returns the held unit to the pool and clears the hold.
pub fn release(item: &Item) -> StockChange {
    StockChange::from_item(item, item.quantity + 1, false)
}

/// Sets an absolute quantity (manual stock correction), keeping any hold.
pub fn restock(item: &Item, quantity: i64) -> StockChange {
    StockChange::from_item(item, quantity, item.is_held())
}

fn unavailable(item: &Item) -> CoreError {
    CoreError::ItemUnavailable {
        item_id: item.id.clone(),
        name: item.name.clone(),
        status: item.status,
        quantity: item.quantity,
    }
}

// =============================================================================
// Unit Rules
// =============================================================================

/// Checks that a unit can be handed out as part of a loan on `item_id`.
pub fn check_unit_for_loan(unit: &ItemUnit, item_id: &str) -> CoreResult<()> {
    check_unit_owner(unit, item_id)?;
    if unit.status != UnitStatus::Available {
        return Err(CoreError::UnitUnavailable {
            unit_code: unit.unit_code.clone(),
            status: unit.status,
        });
    }
    Ok(())
}

/// Checks that a unit belongs to the item a record refers to.
pub fn check_unit_owner(unit: &ItemUnit, item_id: &str) -> CoreResult<()> {
    if unit.item_id != item_id {
        return Err(CoreError::UnitItemMismatch {
            unit_code: unit.unit_code.clone(),
            item_id: item_id.to_string(),
        });
    }
    Ok(())
}

/// Checks that a unit can be reported damaged.
pub fn check_unit_for_report(unit: &ItemUnit, item_id: &str) -> CoreResult<()> {
    check_unit_owner(unit, item_id)?;
    match unit.status {
        UnitStatus::Damaged | UnitStatus::InRepair => Err(CoreError::UnitUnavailable {
            unit_code: unit.unit_code.clone(),
            status: unit.status,
        }),
        _ => Ok(()),
    }
}

/// Unit status that follows a damage report reaching `status`.
///
/// `on_loan` is whether an Active loan still holds the unit. A resolved
/// unit goes back to that loan instead of the shelf.
pub fn unit_status_for_report(status: ReportStatus, on_loan: bool) -> UnitStatus {
    match status {
        ReportStatus::Reported | ReportStatus::RepairRequested => UnitStatus::Damaged,
        ReportStatus::InRepair => UnitStatus::InRepair,
        ReportStatus::Repaired | ReportStatus::Rejected if on_loan => UnitStatus::Loaned,
        ReportStatus::Repaired | ReportStatus::Rejected => UnitStatus::Available,
    }
}

/// Whether staff may set a unit to `to` by hand.
///
/// Loaned, Damaged and InRepair are owned by the loan and report workflows.
pub fn check_manual_unit_status(unit: &ItemUnit, to: UnitStatus) -> CoreResult<()> {
    let manual = matches!(to, UnitStatus::Available | UnitStatus::Unavailable);
    let free = matches!(unit.status, UnitStatus::Available | UnitStatus::Unavailable);
    if to == unit.status || (manual && free) {
        Ok(())
    } else {
        Err(CoreError::UnitUnavailable {
            unit_code: unit.unit_code.clone(),
            status: unit.status,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
