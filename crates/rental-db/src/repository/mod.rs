//! # Repository Module
//!
//! Database repository implementations for the rental back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.loans().create(&new_loan)                                  │
//! │       ▼                                                                 │
//! │  LoanRepository ──────────┐                                            │
//! │  ReportRepository ────────┤  one transaction per workflow              │
//! │                           ▼                                             │
//! │                 stock (crate-internal)                                 │
//! │                 ├── fetch_item / fetch_unit                            │
//! │                 ├── apply_stock_change  (version-guarded)              │
//! │                 └── set_unit_status                                    │
//! │                           │                                             │
//! │                           ▼                                             │
//! │                     SQLite Database                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`](category::CategoryRepository) - Category CRUD
//! - [`ItemRepository`](item::ItemRepository) - Items and stock corrections
//! - [`UnitRepository`](unit::UnitRepository) - Individually tracked units
//! - [`LoanRepository`](loan::LoanRepository) - Loan lifecycle
//! - [`ReportRepository`](report::ReportRepository) - Broken-item workflow
//! - [`UserRepository`](user::UserRepository) - Staff accounts
//! - [`NotificationRepository`](notification::NotificationRepository) - Stored notifications

pub mod category;
pub mod item;
pub mod loan;
pub mod notification;
pub mod report;
pub(crate) mod stock;
pub mod unit;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;
