//! Row access shared by the transactional workflows.
//!
//! Every function takes a bare connection so callers can run it inside
//! their own transaction. Nothing here commits.

use chrono::Utc;
use rental_core::{Item, ItemUnit, LoanStatus, StockChange, UnitStatus};
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

pub(crate) const ITEM_COLUMNS: &str =
    "id, category_id, name, description, quantity, status, version, created_at, updated_at";

pub(crate) const UNIT_COLUMNS: &str = "id, item_id, unit_code, status, notes, created_at, updated_at";

/// Loads an item or fails with NotFound.
pub(crate) async fn fetch_item(conn: &mut SqliteConnection, id: &str) -> DbResult<Item> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
    sqlx::query_as::<_, Item>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Item", id))
}

/// Writes a stock change if the item still has the version it was computed from.
///
/// ```text
/// UPDATE items SET quantity = ?, status = ?, version = version + 1
///  WHERE id = ? AND version = ?expected
///
/// 1 row  → written
/// 0 rows → someone else moved the stock first → Conflict
/// BUSY   → another connection committed since our read → Conflict
/// ```
pub(crate) async fn apply_stock_change(
    conn: &mut SqliteConnection,
    change: &StockChange,
) -> DbResult<()> {
    debug!(
        item_id = %change.item_id,
        quantity = change.quantity,
        status = ?change.status,
        expected_version = change.expected_version,
        "Applying stock change"
    );

    let result = sqlx::query(
        r#"
        UPDATE items
        SET
            quantity = ?2,
            status = ?3,
            version = version + 1,
            updated_at = ?4
        WHERE id = ?1 AND version = ?5
        "#,
    )
    .bind(&change.item_id)
    .bind(change.quantity)
    .bind(change.status)
    .bind(Utc::now())
    .bind(change.expected_version)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).on("Item", &change.item_id))?;

    if result.rows_affected() == 0 {
        warn!(item_id = %change.item_id, "Stale stock write rejected");
        return Err(DbError::conflict("Item", &change.item_id));
    }

    Ok(())
}

/// Loads a unit or fails with NotFound.
pub(crate) async fn fetch_unit(conn: &mut SqliteConnection, id: &str) -> DbResult<ItemUnit> {
    let sql = format!("SELECT {UNIT_COLUMNS} FROM item_units WHERE id = ?1");
    sqlx::query_as::<_, ItemUnit>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("ItemUnit", id))
}

pub(crate) async fn set_unit_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: UnitStatus,
) -> DbResult<()> {
    debug!(unit_id = %id, status = ?status, "Setting unit status");

    let result = sqlx::query("UPDATE item_units SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).on("ItemUnit", id))?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("ItemUnit", id));
    }

    Ok(())
}

/// Puts a loaned unit back on the shelf.
///
/// Only a unit still marked Loaned is touched: one reported damaged while
/// out keeps its Damaged status.
pub(crate) async fn return_unit(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query(
        "UPDATE item_units SET status = 'available', updated_at = ?2 WHERE id = ?1 AND status = 'loaned'",
    )
    .bind(id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).on("ItemUnit", id))?;

    Ok(())
}

/// Whether an Active loan currently holds the unit.
pub(crate) async fn unit_on_loan(conn: &mut SqliteConnection, unit_id: &str) -> DbResult<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM loans WHERE item_unit_id = ?1 AND status = ?2 LIMIT 1")
            .bind(unit_id)
            .bind(LoanStatus::Active)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}
