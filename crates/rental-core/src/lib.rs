//! # rental-core: Pure Business Logic for the Rental Back Office
//!
//! Domain types and the rules that keep stock consistent, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rental Desk Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React)                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    rental-api (axum)                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rental-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  ledger   │  │ workflow  │  │ validation│  │   │
//! │  │   │ Item/Loan │  │ take_one  │  │ Loan/     │  │   rules   │  │   │
//! │  │   │ Report    │  │ hold      │  │ Report FSM│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 rental-db (Database Layer)                      │   │
//! │  │       SQLite queries, migrations, transactional workflows       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Loan, BrokenItemReport, etc.)
//! - [`input`] - Create/update payloads and their field rules
//! - [`ledger`] - Stock movement rules for items and units
//! - [`workflow`] - Loan and damage-report state machines
//! - [`validation`] - Field validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use rental_core::{ledger, Item, ItemStatus};
//!
//! let item = Item {
//!     id: "item-1".into(),
//!     category_id: "cat-1".into(),
//!     name: "Tripod".into(),
//!     description: None,
//!     quantity: 1,
//!     status: ItemStatus::Available,
//!     version: 0,
//!     created_at: Utc::now(),
//!     updated_at: Utc::now(),
//! };
//!
//! // Renting the last tripod empties the pool
//! let change = ledger::take_one(&item).unwrap();
//! assert_eq!(change.quantity, 0);
//! assert_eq!(change.status, ItemStatus::Unavailable);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod input;
pub mod ledger;
pub mod types;
pub mod validation;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::StockChange;
pub use types::*;
pub use workflow::{LoanClosing, StockEffect};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of names (items, categories, renters, users).
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of free-text fields (descriptions, notes).
pub const MAX_TEXT_LEN: usize = 2000;

/// Maximum length of a unit code.
pub const MAX_UNIT_CODE_LEN: usize = 50;

/// Maximum stock quantity staff may enter for one item.
pub const MAX_QUANTITY: i64 = 10_000;

/// Minimum password length for staff accounts.
pub const MIN_PASSWORD_LEN: usize = 8;
