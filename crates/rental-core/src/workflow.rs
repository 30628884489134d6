//! # Loan and Report State Machines
//!
//! ## Loan
//! ```text
//!            ┌──────────► Returned
//!   Active ──┤
//!            └──────────► Cancelled
//! ```
//! Only an Active loan may be returned, cancelled, or moved to another item.
//!
//! ## Damage Report
//! ```text
//!   Reported ──► RepairRequested ──► InRepair ──► Repaired
//!       │               │               │
//!       └───────────────┴───────────────┴───────► Rejected
//! ```
//! Repaired and Rejected are terminal and put the held unit back in stock.

use crate::error::{CoreError, CoreResult};
use crate::types::{Loan, LoanStatus, ReportStatus};

// =============================================================================
// Loans
// =============================================================================

/// Ensures `loan` is Active before performing `operation` on it.
pub fn ensure_active(loan: &Loan, operation: &'static str) -> CoreResult<()> {
    if loan.status != LoanStatus::Active {
        return Err(CoreError::LoanNotActive {
            loan_id: loan.id.clone(),
            status: loan.status,
            operation,
        });
    }
    Ok(())
}

/// How a loan ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanClosing {
    Return,
    Cancel,
}

impl LoanClosing {
    pub fn status(self) -> LoanStatus {
        match self {
            LoanClosing::Return => LoanStatus::Returned,
            LoanClosing::Cancel => LoanStatus::Cancelled,
        }
    }

    pub fn operation(self) -> &'static str {
        match self {
            LoanClosing::Return => "return",
            LoanClosing::Cancel => "cancel",
        }
    }
}

// =============================================================================
// Damage Reports
// =============================================================================

/// What a report transition does to the item's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Quantity untouched.
    None,
    /// The held unit goes back in the pool and the hold is cleared.
    Release,
}

impl ReportStatus {
    /// Whether the report is finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Repaired | ReportStatus::Rejected)
    }

    /// Whether the workflow allows moving from `self` to `to`.
    pub fn can_transition_to(self, to: ReportStatus) -> bool {
        use ReportStatus::*;
        matches!(
            (self, to),
            (Reported, RepairRequested)
                | (Reported, Rejected)
                | (RepairRequested, InRepair)
                | (RepairRequested, Rejected)
                | (InRepair, Repaired)
                | (InRepair, Rejected)
        )
    }

    /// Stock effect of entering this status.
    pub fn stock_effect(self) -> StockEffect {
        if self.is_terminal() {
            StockEffect::Release
        } else {
            StockEffect::None
        }
    }
}

/// Validates a report transition and returns its stock effect.
pub fn plan_report_transition(
    report_id: &str,
    from: ReportStatus,
    to: ReportStatus,
) -> CoreResult<StockEffect> {
    if !from.can_transition_to(to) {
        return Err(CoreError::InvalidReportTransition {
            report_id: report_id.to_string(),
            from,
            to,
        });
    }
    Ok(to.stock_effect())
}

// =============================================================================
// Unit Tests
// =============================================================================
