//! # Broken-Item Report Repository
//!
//! The damage workflow. Filing a report pulls one unit of stock and holds
//! the item; resolving it gives the unit back.
//!
//! ## Report Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  report()            hold(item)      quantity - 1, status Held         │
//! │     │                unit → Damaged                                     │
//! │     │                notify reviewers (admins, technicians)             │
//! │     ▼                                                                   │
//! │  Reported ──► RepairRequested ──► InRepair ──► Repaired                │
//! │     │               │                │            │                     │
//! │     └───────────────┴────────────────┴──► Rejected│                     │
//! │                                              │    │                     │
//! │                          release(item) ◄─────┴────┘                     │
//! │                          quantity + 1, hold cleared                     │
//! │                                                                         │
//! │  Every transition notifies the reporter and the repair requester.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use rental_core::input::{NewReport, ReportTransition};
use rental_core::workflow::{self, StockEffect};
use rental_core::{ledger, BrokenItemReport, NotificationKind, ReportStatus, UnitStatus};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::notification::{self, Notice};
use super::stock;
use super::user;
use crate::error::{DbError, DbResult};

const REPORT_COLUMNS: &str = "id, item_id, item_unit_id, reporter_id, description, \
     proof_image_path, status, repair_notes, repair_requester_id, repair_requested_at, \
     resolved_at, created_at, updated_at";

const SUBJECT_TYPE: &str = "broken_item_report";

/// List filter. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub item_id: Option<String>,
    pub reporter_id: Option<String>,
}

/// Repository for broken-item reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Lists reports matching `filter`, newest first.
    pub async fn list(&self, filter: &ReportFilter) -> DbResult<Vec<BrokenItemReport>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {REPORT_COLUMNS} FROM broken_item_reports WHERE 1 = 1"));

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(item_id) = &filter.item_id {
            qb.push(" AND item_id = ").push_bind(item_id.clone());
        }
        if let Some(reporter_id) = &filter.reporter_id {
            qb.push(" AND reporter_id = ").push_bind(reporter_id.clone());
        }
        qb.push(" ORDER BY created_at DESC");

        let reports = qb
            .build_query_as::<BrokenItemReport>()
            .fetch_all(&self.pool)
            .await?;
        Ok(reports)
    }

    /// Gets a report by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<BrokenItemReport>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM broken_item_reports WHERE id = ?1");
        let report = sqlx::query_as::<_, BrokenItemReport>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(report)
    }

    /// Files a damage report.
    ///
    /// ## Errors
    /// - `Domain(ItemAlreadyHeld)` if another open report holds the item
    /// - `Domain(ItemUnavailable)` if nothing is left in the pool
    /// - `NotFound` for an unknown item, unit or reporter
    /// - `Conflict` if the item's stock moved while this ran
    pub async fn report(&self, input: &NewReport) -> DbResult<BrokenItemReport> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        user::find_user(&mut tx, &input.reporter_id)
            .await?
            .ok_or_else(|| DbError::not_found("User", &input.reporter_id))?;

        let item = stock::fetch_item(&mut tx, &input.item_id).await?;
        let change = ledger::hold(&item)?;

        if let Some(unit_id) = &input.item_unit_id {
            let unit = stock::fetch_unit(&mut tx, unit_id).await?;
            ledger::check_unit_for_report(&unit, &item.id)?;
            let on_loan = unit.status == UnitStatus::Loaned;
            let status = ledger::unit_status_for_report(ReportStatus::Reported, on_loan);
            stock::set_unit_status(&mut tx, unit_id, status).await?;
        }
        stock::apply_stock_change(&mut tx, &change).await?;

        let now = Utc::now();
        let report = BrokenItemReport {
            id: Uuid::new_v4().to_string(),
            item_id: item.id.clone(),
            item_unit_id: input.item_unit_id.clone(),
            reporter_id: input.reporter_id.clone(),
            description: input.description.trim().to_string(),
            proof_image_path: input.proof_image_path.clone(),
            status: ReportStatus::Reported,
            repair_notes: None,
            repair_requester_id: None,
            repair_requested_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO broken_item_reports (
                id, item_id, item_unit_id, reporter_id, description,
                proof_image_path, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&report.id)
        .bind(&report.item_id)
        .bind(&report.item_unit_id)
        .bind(&report.reporter_id)
        .bind(&report.description)
        .bind(&report.proof_image_path)
        .bind(report.status)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&mut *tx)
        .await?;

        let reviewers = user::reviewer_ids(&mut tx).await?;
        let notice = Notice {
            kind: NotificationKind::ReportFiled,
            subject_type: SUBJECT_TYPE,
            subject_id: &report.id,
            message: format!("Damage reported on '{}': {}", item.name, report.description),
        };
        notification::notify(&mut tx, &reviewers, &notice).await?;

        tx.commit().await?;

        info!(
            report_id = %report.id,
            item_id = %report.item_id,
            quantity = change.quantity,
            "Damage reported, item held"
        );
        Ok(report)
    }

    /// Moves a report through the repair workflow.
    ///
    /// Entering Repaired or Rejected returns the held unit to stock and
    /// clears the hold. Any other transition leaves the quantity alone.
    pub async fn update_status(
        &self,
        id: &str,
        transition: &ReportTransition,
    ) -> DbResult<BrokenItemReport> {
        transition.validate()?;

        let mut tx = self.pool.begin().await?;
        let mut report = fetch_report(&mut tx, id).await?;
        let from = report.status;
        let to = transition.status;

        let effect = workflow::plan_report_transition(&report.id, from, to)?;
        let now = Utc::now();

        if to == ReportStatus::RepairRequested {
            if let Some(actor_id) = &transition.actor_id {
                user::find_user(&mut tx, actor_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("User", actor_id))?;
                report.repair_requester_id = Some(actor_id.clone());
                report.repair_requested_at = Some(now);
            }
        }

        let item = stock::fetch_item(&mut tx, &report.item_id).await?;
        if effect == StockEffect::Release {
            let change = ledger::release(&item);
            stock::apply_stock_change(&mut tx, &change).await?;
            info!(item_id = %item.id, quantity = change.quantity, "Hold released");
        }

        if let Some(unit_id) = &report.item_unit_id {
            let on_loan = stock::unit_on_loan(&mut tx, unit_id).await?;
            stock::set_unit_status(&mut tx, unit_id, ledger::unit_status_for_report(to, on_loan)).await?;
        }

        if to.is_terminal() {
            report.resolved_at = Some(now);
        }
        if let Some(notes) = &transition.notes {
            report.repair_notes = Some(notes.clone());
        }
        report.status = to;
        report.updated_at = now;

        debug!(report_id = %id, from = ?from, to = ?to, "Updating report status");

        sqlx::query(
            r#"
            UPDATE broken_item_reports SET
                status = ?2,
                repair_notes = ?3,
                repair_requester_id = ?4,
                repair_requested_at = ?5,
                resolved_at = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&report.id)
        .bind(report.status)
        .bind(&report.repair_notes)
        .bind(&report.repair_requester_id)
        .bind(report.repair_requested_at)
        .bind(report.resolved_at)
        .bind(report.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut recipients = vec![report.reporter_id.clone()];
        recipients.extend(report.repair_requester_id.clone());
        let notice = Notice {
            kind: NotificationKind::ReportStatusChanged,
            subject_type: SUBJECT_TYPE,
            subject_id: &report.id,
            message: format!("Report on '{}' moved from {:?} to {:?}", item.name, from, to),
        };
        notification::notify(&mut tx, &recipients, &notice).await?;

        tx.commit().await?;

        info!(report_id = %id, from = ?from, to = ?to, "Report status changed");
        Ok(report)
    }
}

async fn fetch_report(conn: &mut SqliteConnection, id: &str) -> DbResult<BrokenItemReport> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM broken_item_reports WHERE id = ?1");
    sqlx::query_as::<_, BrokenItemReport>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("BrokenItemReport", id))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use rental_core::input::NewLoan;
    use rental_core::{CoreError, ItemStatus, UserRole};

    fn transition(status: ReportStatus, actor_id: Option<&str>) -> ReportTransition {
        ReportTransition {
            status,
            notes: None,
            actor_id: actor_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_report_holds_item_once() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let item = testing::item(&db, 3).await;

        let report = db
            .reports()
            .report(&testing::new_report(&item.id, &reporter.id))
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Reported);

        let held = testing::reload(&db, &item.id).await;
        assert_eq!(held.quantity, 2);
        assert_eq!(held.status, ItemStatus::Held);

        let err = db
            .reports()
            .report(&testing::new_report(&item.id, &reporter.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemAlreadyHeld { .. })));
        assert_eq!(testing::reload(&db, &item.id).await.quantity, 2);
    }

    #[tokio::test]
    async fn test_held_item_cannot_be_rented() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let item = testing::item(&db, 3).await;
        db.reports()
            .report(&testing::new_report(&item.id, &reporter.id))
            .await
            .unwrap();

        let err = db.loans().create(&testing::new_loan(&item.id)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_report_needs_stock() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let item = testing::item(&db, 0).await;

        let err = db
            .reports()
            .report(&testing::new_report(&item.id, &reporter.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_full_repair_cycle() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let tech = testing::user(&db, UserRole::Technician).await;
        let item = testing::item(&db, 1).await;
        let report = db
            .reports()
            .report(&testing::new_report(&item.id, &reporter.id))
            .await
            .unwrap();
        assert_eq!(testing::reload(&db, &item.id).await.status, ItemStatus::Held);

        let requested = db
            .reports()
            .update_status(&report.id, &transition(ReportStatus::RepairRequested, Some(&tech.id)))
            .await
            .unwrap();
        assert_eq!(requested.repair_requester_id.as_deref(), Some(tech.id.as_str()));
        assert!(requested.repair_requested_at.is_some());

        let in_repair = db
            .reports()
            .update_status(&report.id, &transition(ReportStatus::InRepair, None))
            .await
            .unwrap();
        assert!(in_repair.resolved_at.is_none());
        let during = testing::reload(&db, &item.id).await;
        assert_eq!(during.quantity, 0);
        assert_eq!(during.status, ItemStatus::Held);

        let repaired = db
            .reports()
            .update_status(&report.id, &transition(ReportStatus::Repaired, None))
            .await
            .unwrap();
        assert!(repaired.resolved_at.is_some());
        let after = testing::reload(&db, &item.id).await;
        assert_eq!(after.quantity, 1);
        assert_eq!(after.status, ItemStatus::Available);
    }

    #[tokio::test]
    async fn test_rejection_releases_stock() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let item = testing::item(&db, 2).await;
        let report = db
            .reports()
            .report(&testing::new_report(&item.id, &reporter.id))
            .await
            .unwrap();

        let rejected = db
            .reports()
            .update_status(
                &report.id,
                &ReportTransition {
                    status: ReportStatus::Rejected,
                    notes: Some("cosmetic scratch only".to_string()),
                    actor_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.repair_notes.as_deref(), Some("cosmetic scratch only"));

        let after = testing::reload(&db, &item.id).await;
        assert_eq!(after.quantity, 2);
        assert_eq!(after.status, ItemStatus::Available);

        let err = db
            .reports()
            .update_status(&report.id, &transition(ReportStatus::InRepair, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidReportTransition { .. })));
        assert_eq!(testing::reload(&db, &item.id).await.quantity, 2);
    }

    #[tokio::test]
    async fn test_unit_follows_report() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let item = testing::item(&db, 1).await;
        let unit = testing::unit(&db, &item.id, "MIC-007").await;

        let input = NewReport {
            item_unit_id: Some(unit.id.clone()),
            ..testing::new_report(&item.id, &reporter.id)
        };
        let report = db.reports().report(&input).await.unwrap();
        assert_eq!(testing::unit_status(&db, &unit.id).await, UnitStatus::Damaged);

        db.reports()
            .update_status(&report.id, &transition(ReportStatus::RepairRequested, Some(&reporter.id)))
            .await
            .unwrap();
        db.reports()
            .update_status(&report.id, &transition(ReportStatus::InRepair, None))
            .await
            .unwrap();
        assert_eq!(testing::unit_status(&db, &unit.id).await, UnitStatus::InRepair);

        db.reports()
            .update_status(&report.id, &transition(ReportStatus::Repaired, None))
            .await
            .unwrap();
        assert_eq!(testing::unit_status(&db, &unit.id).await, UnitStatus::Available);
    }

    #[tokio::test]
    async fn test_resolved_unit_returns_to_its_loan() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let item = testing::item(&db, 2).await;
        let unit = testing::unit(&db, &item.id, "CAM-014").await;
        let loan = testing::loan_unit(&db, &item.id, &unit.id).await;

        let input = NewReport {
            item_unit_id: Some(unit.id.clone()),
            ..testing::new_report(&item.id, &reporter.id)
        };
        let report = db.reports().report(&input).await.unwrap();
        assert_eq!(testing::unit_status(&db, &unit.id).await, UnitStatus::Damaged);

        db.reports()
            .update_status(&report.id, &transition(ReportStatus::Rejected, None))
            .await
            .unwrap();
        assert_eq!(testing::unit_status(&db, &unit.id).await, UnitStatus::Loaned);

        // The renter still has it
        let second = NewLoan {
            item_unit_id: Some(unit.id.clone()),
            ..testing::new_loan(&item.id)
        };
        let err = db.loans().create(&second).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::UnitUnavailable { .. })));

        db.loans().return_loan(&loan.id).await.unwrap();
        assert_eq!(testing::unit_status(&db, &unit.id).await, UnitStatus::Available);
    }

    #[tokio::test]
    async fn test_notifications() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let admin = testing::user(&db, UserRole::Admin).await;
        let tech = testing::user(&db, UserRole::Technician).await;
        let item = testing::item(&db, 1).await;

        let report = db
            .reports()
            .report(&testing::new_report(&item.id, &reporter.id))
            .await
            .unwrap();

        for reviewer in [&admin, &tech] {
            let inbox = db.notifications().list_for_user(&reviewer.id, true).await.unwrap();
            assert_eq!(inbox.len(), 1);
            assert_eq!(inbox[0].kind, NotificationKind::ReportFiled);
            assert_eq!(inbox[0].subject_id, report.id);
        }
        assert!(db.notifications().list_for_user(&reporter.id, false).await.unwrap().is_empty());

        db.reports()
            .update_status(&report.id, &transition(ReportStatus::RepairRequested, Some(&tech.id)))
            .await
            .unwrap();
        db.reports()
            .update_status(&report.id, &transition(ReportStatus::InRepair, None))
            .await
            .unwrap();

        let reporter_inbox = db.notifications().list_for_user(&reporter.id, false).await.unwrap();
        assert_eq!(reporter_inbox.len(), 2);
        assert!(reporter_inbox
            .iter()
            .all(|n| n.kind == NotificationKind::ReportStatusChanged));

        // The technician got the filing notice plus both status changes
        let tech_inbox = db.notifications().list_for_user(&tech.id, false).await.unwrap();
        assert_eq!(tech_inbox.len(), 3);
        let admin_inbox = db.notifications().list_for_user(&admin.id, false).await.unwrap();
        assert_eq!(admin_inbox.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_hold_is_a_conflict() {
        let db = testing::db().await;
        let item = testing::item(&db, 2).await;

        // Someone else rents a unit after we read the item
        db.loans().create(&testing::new_loan(&item.id)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let stale = ledger::hold(&item).unwrap();
        let err = stock::apply_stock_change(&mut conn, &stale).await.unwrap_err();
        drop(conn);
        assert!(matches!(err, DbError::Conflict { .. }));

        let current = testing::reload(&db, &item.id).await;
        assert_eq!(current.quantity, 1);
        assert_eq!(current.status, ItemStatus::Available);
    }

    #[tokio::test]
    async fn test_list_filter() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;
        let first = testing::item(&db, 1).await;
        let second = testing::item(&db, 1).await;
        let report = db
            .reports()
            .report(&testing::new_report(&first.id, &reporter.id))
            .await
            .unwrap();
        db.reports()
            .report(&testing::new_report(&second.id, &reporter.id))
            .await
            .unwrap();
        db.reports()
            .update_status(&report.id, &transition(ReportStatus::Rejected, None))
            .await
            .unwrap();

        let open = db
            .reports()
            .list(&ReportFilter {
                status: Some(ReportStatus::Reported),
                ..ReportFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].item_id, second.id);
        assert_eq!(db.reports().list(&ReportFilter::default()).await.unwrap().len(), 2);
    }
}
