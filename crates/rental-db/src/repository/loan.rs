//! # Loan Repository
//!
//! Loan lifecycle. Every operation that moves stock is one transaction.
//!
//! ## Loan Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Loan Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── take_one(item)  → quantity - 1                                 │
//! │     └── unit → Loaned (if a unit was handed out)                       │
//! │     └── INSERT loan { status: Active }                                 │
//! │                                                                         │
//! │  2. UPDATE (optional)                                                  │
//! │     └── item changed? put_back(old) + take_one(new)                    │
//! │                                                                         │
//! │  3. RETURN / CANCEL                                                    │
//! │     └── put_back(item)  → quantity + 1                                 │
//! │     └── unit → Available                                               │
//! │     └── loan { status: Returned | Cancelled }                          │
//! │                                                                         │
//! │  All of 1-3 commit or roll back as a whole.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use rental_core::input::{LoanChanges, NewLoan};
use rental_core::validation::validate_rental_period;
use rental_core::workflow::{self, LoanClosing};
use rental_core::{ledger, Loan, LoanStatus, UnitStatus};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::stock;
use crate::error::{DbError, DbResult};

const LOAN_COLUMNS: &str = "id, renter_name, renter_phone, item_id, item_unit_id, rental_date, \
     return_deadline, return_date, status, notes, created_at, updated_at";

/// List filter. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub item_id: Option<String>,
    /// Only Active loans whose deadline has passed.
    #[serde(default)]
    pub overdue: bool,
}

/// Repository for loan database operations.
#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    /// Creates a new LoanRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoanRepository { pool }
    }

    /// Lists loans matching `filter`, newest rental first.
    pub async fn list(&self, filter: &LoanFilter) -> DbResult<Vec<Loan>> {
        self.list_as_of(filter, Utc::now().date_naive()).await
    }

    /// Same as [`list`](Self::list) with an explicit "today" for the overdue filter.
    pub async fn list_as_of(&self, filter: &LoanFilter, today: NaiveDate) -> DbResult<Vec<Loan>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {LOAN_COLUMNS} FROM loans WHERE 1 = 1"));

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(item_id) = &filter.item_id {
            qb.push(" AND item_id = ").push_bind(item_id.clone());
        }
        if filter.overdue {
            qb.push(" AND status = ")
                .push_bind(LoanStatus::Active)
                .push(" AND return_deadline < ")
                .push_bind(today);
        }
        qb.push(" ORDER BY rental_date DESC, created_at DESC");

        let loans = qb.build_query_as::<Loan>().fetch_all(&self.pool).await?;
        debug!(count = loans.len(), overdue = filter.overdue, "Listed loans");
        Ok(loans)
    }

    /// Gets a loan by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Loan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1");
        let loan = sqlx::query_as::<_, Loan>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(loan)
    }

    /// Rents one unit of an item out.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for bad renter fields or a deadline before the rental date
    /// - `Domain(ItemUnavailable)` if the item is out of stock or held
    /// - `Domain(UnitUnavailable | UnitItemMismatch)` for an unusable unit
    /// - `Conflict` if the item's stock moved while this ran
    pub async fn create(&self, input: &NewLoan) -> DbResult<Loan> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        let item = stock::fetch_item(&mut tx, &input.item_id).await?;
        let change = ledger::take_one(&item)?;

        if let Some(unit_id) = &input.item_unit_id {
            claim_unit(&mut tx, unit_id, &item.id).await?;
        }
        stock::apply_stock_change(&mut tx, &change).await?;

        let now = Utc::now();
        let loan = Loan {
            id: Uuid::new_v4().to_string(),
            renter_name: input.renter_name.trim().to_string(),
            renter_phone: input.renter_phone.trim().to_string(),
            item_id: item.id.clone(),
            item_unit_id: input.item_unit_id.clone(),
            rental_date: input.rental_date,
            return_deadline: input.return_deadline,
            return_date: None,
            status: LoanStatus::Active,
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO loans (
                id, renter_name, renter_phone, item_id, item_unit_id,
                rental_date, return_deadline, return_date, status, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.renter_name)
        .bind(&loan.renter_phone)
        .bind(&loan.item_id)
        .bind(&loan.item_unit_id)
        .bind(loan.rental_date)
        .bind(loan.return_deadline)
        .bind(loan.return_date)
        .bind(loan.status)
        .bind(&loan.notes)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            loan_id = %loan.id,
            item_id = %loan.item_id,
            quantity = change.quantity,
            "Loan created"
        );
        Ok(loan)
    }

    /// Marks an Active loan Returned and puts its stock back.
    pub async fn return_loan(&self, id: &str) -> DbResult<Loan> {
        self.close(id, LoanClosing::Return).await
    }

    /// Marks an Active loan Cancelled and puts its stock back.
    pub async fn cancel(&self, id: &str) -> DbResult<Loan> {
        self.close(id, LoanClosing::Cancel).await
    }

    async fn close(&self, id: &str, closing: LoanClosing) -> DbResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let mut loan = fetch_loan(&mut tx, id).await?;
        workflow::ensure_active(&loan, closing.operation())?;

        restore_stock(&mut tx, &loan).await?;

        let now = Utc::now();
        loan.status = closing.status();
        loan.updated_at = now;
        if closing == LoanClosing::Return {
            loan.return_date = Some(now);
        }

        sqlx::query("UPDATE loans SET status = ?2, return_date = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(&loan.id)
            .bind(loan.status)
            .bind(loan.return_date)
            .bind(loan.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(loan_id = %id, status = ?loan.status, "Loan closed");
        Ok(loan)
    }

    /// Applies a partial update.
    ///
    /// Moving an Active loan to another item (or unit) gives the old stock
    /// back and takes the new stock in the same transaction. If the new
    /// item is unavailable nothing changes.
    pub async fn update(&self, id: &str, changes: &LoanChanges) -> DbResult<Loan> {
        changes.validate()?;

        let mut tx = self.pool.begin().await?;
        let current = fetch_loan(&mut tx, id).await?;

        let item_id = changes.item_id.clone().unwrap_or_else(|| current.item_id.clone());
        let item_changed = item_id != current.item_id;
        let item_unit_id = match &changes.item_unit_id {
            Some(unit) => unit.clone(),
            // The old unit belongs to the old item
            None if item_changed => None,
            None => current.item_unit_id.clone(),
        };
        let unit_changed = item_unit_id != current.item_unit_id;

        if item_changed || unit_changed {
            workflow::ensure_active(&current, "change item")?;
        }

        let rental_date = changes.rental_date.unwrap_or(current.rental_date);
        let return_deadline = changes.return_deadline.unwrap_or(current.return_deadline);
        validate_rental_period(rental_date, return_deadline)?;

        if item_changed {
            let old_item = stock::fetch_item(&mut tx, &current.item_id).await?;
            stock::apply_stock_change(&mut tx, &ledger::put_back(&old_item)).await?;

            let new_item = stock::fetch_item(&mut tx, &item_id).await?;
            stock::apply_stock_change(&mut tx, &ledger::take_one(&new_item)?).await?;

            info!(loan_id = %id, from = %current.item_id, to = %item_id, "Loan moved to another item");
        }
        if item_changed || unit_changed {
            if let Some(old_unit) = &current.item_unit_id {
                stock::return_unit(&mut tx, old_unit).await?;
            }
            if let Some(new_unit) = &item_unit_id {
                claim_unit(&mut tx, new_unit, &item_id).await?;
            }
        }

        let loan = Loan {
            renter_name: changes
                .renter_name
                .as_deref()
                .map(|n| n.trim().to_string())
                .unwrap_or(current.renter_name),
            renter_phone: changes
                .renter_phone
                .as_deref()
                .map(|p| p.trim().to_string())
                .unwrap_or(current.renter_phone),
            item_id,
            item_unit_id,
            rental_date,
            return_deadline,
            notes: changes.notes.clone().unwrap_or(current.notes),
            updated_at: Utc::now(),
            ..current
        };

        debug!(loan_id = %id, "Updating loan");

        sqlx::query(
            r#"
            UPDATE loans SET
                renter_name = ?2,
                renter_phone = ?3,
                item_id = ?4,
                item_unit_id = ?5,
                rental_date = ?6,
                return_deadline = ?7,
                notes = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.renter_name)
        .bind(&loan.renter_phone)
        .bind(&loan.item_id)
        .bind(&loan.item_unit_id)
        .bind(loan.rental_date)
        .bind(loan.return_deadline)
        .bind(&loan.notes)
        .bind(loan.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Deletes a loan. An Active loan's stock is put back first.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let loan = fetch_loan(&mut tx, id).await?;

        if loan.status == LoanStatus::Active {
            restore_stock(&mut tx, &loan).await?;
        }

        sqlx::query("DELETE FROM loans WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(loan_id = %id, was = ?loan.status, "Loan deleted");
        Ok(())
    }
}

async fn fetch_loan(conn: &mut SqliteConnection, id: &str) -> DbResult<Loan> {
    let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1");
    sqlx::query_as::<_, Loan>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Loan", id))
}

/// Checks a unit can go out with a loan on `item_id` and marks it Loaned.
async fn claim_unit(conn: &mut SqliteConnection, unit_id: &str, item_id: &str) -> DbResult<()> {
    let unit = stock::fetch_unit(conn, unit_id).await?;
    ledger::check_unit_for_loan(&unit, item_id)?;
    stock::set_unit_status(conn, unit_id, UnitStatus::Loaned).await
}

/// Gives an Active loan's item stock (and unit) back.
async fn restore_stock(conn: &mut SqliteConnection, loan: &Loan) -> DbResult<()> {
    let item = stock::fetch_item(conn, &loan.item_id).await?;
    stock::apply_stock_change(conn, &ledger::put_back(&item)).await?;
    if let Some(unit_id) = &loan.item_unit_id {
        stock::return_unit(conn, unit_id).await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use crate::{Database, DbConfig};
    use rental_core::{CoreError, ItemStatus};

    #[tokio::test]
    async fn test_create_takes_exactly_one() {
        let db = testing::db().await;
        let item = testing::item(&db, 2).await;

        let loan = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Active);

        let after = testing::reload(&db, &item.id).await;
        assert_eq!(after.quantity, 1);
        assert_eq!(after.status, ItemStatus::Available);
        assert_eq!(after.version, item.version + 1);
    }

    #[tokio::test]
    async fn test_last_unit_makes_item_unavailable() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;

        db.loans().create(&testing::new_loan(&item.id)).await.unwrap();
        let after = testing::reload(&db, &item.id).await;
        assert_eq!(after.quantity, 0);
        assert_eq!(after.status, ItemStatus::Unavailable);

        let err = db.loans().create(&testing::new_loan(&item.id)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemUnavailable { .. })));
        assert_eq!(db.loans().list(&LoanFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_return_and_cancel_put_back_exactly_one() {
        let db = testing::db().await;
        let item = testing::item(&db, 2).await;

        let first = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();
        let second = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();
        assert_eq!(testing::reload(&db, &item.id).await.quantity, 0);

        let returned = db.loans().return_loan(&first.id).await.unwrap();
        assert_eq!(returned.status, LoanStatus::Returned);
        assert!(returned.return_date.is_some());
        assert_eq!(testing::reload(&db, &item.id).await.quantity, 1);

        let cancelled = db.loans().cancel(&second.id).await.unwrap();
        assert_eq!(cancelled.status, LoanStatus::Cancelled);
        assert!(cancelled.return_date.is_none());
        let after = testing::reload(&db, &item.id).await;
        assert_eq!(after.quantity, 2);
        assert_eq!(after.status, ItemStatus::Available);
    }

    #[tokio::test]
    async fn test_closing_a_closed_loan_is_rejected() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;
        let loan = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();
        db.loans().return_loan(&loan.id).await.unwrap();

        for result in [db.loans().return_loan(&loan.id).await, db.loans().cancel(&loan.id).await] {
            assert!(matches!(
                result,
                Err(DbError::Domain(CoreError::LoanNotActive { .. }))
            ));
        }
        assert_eq!(testing::reload(&db, &item.id).await.quantity, 1);
    }

    #[tokio::test]
    async fn test_unit_loaned_and_returned() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;
        let unit = testing::unit(&db, &item.id, "PRJ-001").await;

        let loan = testing::loan_unit(&db, &item.id, &unit.id).await;
        let out = db.units().get_by_id(&unit.id).await.unwrap().unwrap();
        assert_eq!(out.status, UnitStatus::Loaned);

        db.loans().return_loan(&loan.id).await.unwrap();
        let back = db.units().get_by_id(&unit.id).await.unwrap().unwrap();
        assert_eq!(back.status, UnitStatus::Available);
    }

    #[tokio::test]
    async fn test_unit_of_another_item_is_rejected() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;
        let other = testing::item(&db, 1).await;
        let unit = testing::unit(&db, &other.id, "PRJ-001").await;

        let input = NewLoan {
            item_unit_id: Some(unit.id),
            ..testing::new_loan(&item.id)
        };
        let err = db.loans().create(&input).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::UnitItemMismatch { .. })));
        assert_eq!(testing::reload(&db, &item.id).await.quantity, 1);
    }

    #[tokio::test]
    async fn test_update_moves_stock_between_items() {
        let db = testing::db().await;
        let old_item = testing::item(&db, 1).await;
        let new_item = testing::item(&db, 3).await;
        let loan = db.loans().create(&testing::new_loan(&old_item.id)).await.unwrap();

        let changes = LoanChanges {
            item_id: Some(new_item.id.clone()),
            ..LoanChanges::default()
        };
        let moved = db.loans().update(&loan.id, &changes).await.unwrap();
        assert_eq!(moved.item_id, new_item.id);

        assert_eq!(testing::reload(&db, &old_item.id).await.quantity, 1);
        assert_eq!(testing::reload(&db, &new_item.id).await.quantity, 2);
    }

    #[tokio::test]
    async fn test_update_swaps_unit_on_same_item() {
        let db = testing::db().await;
        let item = testing::item(&db, 2).await;
        let first = testing::unit(&db, &item.id, "LNS-001").await;
        let second = testing::unit(&db, &item.id, "LNS-002").await;
        let loan = testing::loan_unit(&db, &item.id, &first.id).await;
        let before = testing::reload(&db, &item.id).await;

        let changes = LoanChanges {
            item_unit_id: Some(Some(second.id.clone())),
            ..LoanChanges::default()
        };
        let swapped = db.loans().update(&loan.id, &changes).await.unwrap();
        assert_eq!(swapped.item_unit_id.as_deref(), Some(second.id.as_str()));

        assert_eq!(testing::unit_status(&db, &first.id).await, UnitStatus::Available);
        assert_eq!(testing::unit_status(&db, &second.id).await, UnitStatus::Loaned);
        let after = testing::reload(&db, &item.id).await;
        assert_eq!(after.quantity, before.quantity);
        assert_eq!(after.version, before.version);
    }

    #[tokio::test]
    async fn test_failed_move_leaves_both_items_untouched() {
        let db = testing::db().await;
        let old_item = testing::item(&db, 1).await;
        let empty = testing::item(&db, 0).await;
        let loan = db.loans().create(&testing::new_loan(&old_item.id)).await.unwrap();
        let before = testing::reload(&db, &old_item.id).await;

        let changes = LoanChanges {
            item_id: Some(empty.id.clone()),
            renter_name: Some("Someone Else".to_string()),
            ..LoanChanges::default()
        };
        let err = db.loans().update(&loan.id, &changes).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemUnavailable { .. })));

        let old_after = testing::reload(&db, &old_item.id).await;
        assert_eq!(old_after.quantity, before.quantity);
        assert_eq!(old_after.version, before.version);
        assert_eq!(testing::reload(&db, &empty.id).await.quantity, 0);

        let unchanged = db.loans().get_by_id(&loan.id).await.unwrap().unwrap();
        assert_eq!(unchanged.item_id, old_item.id);
        assert_eq!(unchanged.renter_name, loan.renter_name);
    }

    #[tokio::test]
    async fn test_closed_loan_cannot_change_item() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;
        let other = testing::item(&db, 1).await;
        let loan = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();
        db.loans().cancel(&loan.id).await.unwrap();

        let err = db
            .loans()
            .update(
                &loan.id,
                &LoanChanges {
                    item_id: Some(other.id.clone()),
                    ..LoanChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::LoanNotActive { .. })));

        // Notes on a closed loan are still editable
        let noted = db
            .loans()
            .update(
                &loan.id,
                &LoanChanges {
                    notes: Some(Some("renter called".to_string())),
                    ..LoanChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(noted.notes.as_deref(), Some("renter called"));
    }

    #[tokio::test]
    async fn test_update_checks_merged_dates() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;
        let loan = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();

        let changes = LoanChanges {
            return_deadline: Some(loan.rental_date.pred_opt().unwrap()),
            ..LoanChanges::default()
        };
        let err = db.loans().update(&loan.id, &changes).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_active_loan_restores_stock() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;
        let loan = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();

        db.loans().delete(&loan.id).await.unwrap();
        assert_eq!(testing::reload(&db, &item.id).await.quantity, 1);
        assert!(db.loans().get_by_id(&loan.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_after_concurrent_commit_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("rental.db")).max_connections(2);
        let db = Database::new(config).await.unwrap();
        let item = testing::item(&db, 2).await;

        let mut tx = db.pool().begin().await.unwrap();
        let snapshot = stock::fetch_item(&mut tx, &item.id).await.unwrap();

        // Another request rents one and commits first
        db.loans().create(&testing::new_loan(&item.id)).await.unwrap();

        let stale = ledger::take_one(&snapshot).unwrap();
        let err = stock::apply_stock_change(&mut tx, &stale).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { ref entity, ref id } if entity == "Item" && *id == item.id));
        drop(tx);

        let current = testing::reload(&db, &item.id).await;
        assert_eq!(current.quantity, 1);
        assert_eq!(current.version, item.version + 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_overdue_filter() {
        let db = testing::db().await;
        let item = testing::item(&db, 3).await;
        let late = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();
        let returned = db.loans().create(&testing::new_loan(&item.id)).await.unwrap();
        db.loans().return_loan(&returned.id).await.unwrap();

        let after_deadline = late.return_deadline.succ_opt().unwrap();
        let filter = LoanFilter {
            overdue: true,
            ..LoanFilter::default()
        };

        let overdue = db.loans().list_as_of(&filter, after_deadline).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);

        let on_deadline = db.loans().list_as_of(&filter, late.return_deadline).await.unwrap();
        assert!(on_deadline.is_empty());
    }
}
