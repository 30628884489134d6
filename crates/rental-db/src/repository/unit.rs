//! # Item Unit Repository
//!
//! Individually tracked units. A unit's status is bookkeeping of its own:
//! units are not counted into `items.quantity`.
//!
//! ## Who sets unit status
//! ```text
//! Available ◄──► Unavailable       staff, through update()
//! Available ───► Loaned            LoanRepository (and back on return)
//! *         ───► Damaged/InRepair  ReportRepository (Available on resolve)
//! ```

use chrono::Utc;
use rental_core::input::{NewUnit, UnitChanges};
use rental_core::{ledger, CoreError, ItemUnit, UnitStatus};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::stock::{self, UNIT_COLUMNS};
use crate::error::{DbError, DbResult};

/// Repository for item unit database operations.
#[derive(Debug, Clone)]
pub struct UnitRepository {
    pool: SqlitePool,
}

impl UnitRepository {
    /// Creates a new UnitRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UnitRepository { pool }
    }

    /// Lists the units of one item by code.
    pub async fn list_for_item(&self, item_id: &str) -> DbResult<Vec<ItemUnit>> {
        let mut conn = self.pool.acquire().await?;
        stock::fetch_item(&mut conn, item_id).await?;

        let sql = format!("SELECT {UNIT_COLUMNS} FROM item_units WHERE item_id = ?1 ORDER BY unit_code");
        let units = sqlx::query_as::<_, ItemUnit>(&sql)
            .bind(item_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(units)
    }

    /// Gets a unit by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ItemUnit>> {
        let sql = format!("SELECT {UNIT_COLUMNS} FROM item_units WHERE id = ?1");
        let unit = sqlx::query_as::<_, ItemUnit>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(unit)
    }

    /// Registers a new unit of `item_id`. It starts Available.
    pub async fn create(&self, item_id: &str, input: &NewUnit) -> DbResult<ItemUnit> {
        input.validate()?;

        let mut conn = self.pool.acquire().await?;
        stock::fetch_item(&mut conn, item_id).await?;

        let now = Utc::now();
        let unit = ItemUnit {
            id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            unit_code: input.unit_code.trim().to_string(),
            status: UnitStatus::Available,
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %unit.id, unit_code = %unit.unit_code, "Creating unit");

        sqlx::query(
            r#"
            INSERT INTO item_units (id, item_id, unit_code, status, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&unit.id)
        .bind(&unit.item_id)
        .bind(&unit.unit_code)
        .bind(unit.status)
        .bind(&unit.notes)
        .bind(unit.created_at)
        .bind(unit.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).with_value(&unit.unit_code))?;

        info!(id = %unit.id, item_id = %item_id, unit_code = %unit.unit_code, "Unit created");
        Ok(unit)
    }

    /// Applies a partial update. Staff may only toggle Available/Unavailable.
    pub async fn update(&self, id: &str, changes: &UnitChanges) -> DbResult<ItemUnit> {
        changes.validate()?;

        let mut tx = self.pool.begin().await?;
        let mut unit = stock::fetch_unit(&mut tx, id).await?;

        if let Some(status) = changes.status {
            ledger::check_manual_unit_status(&unit, status)?;
            unit.status = status;
        }
        if let Some(code) = &changes.unit_code {
            unit.unit_code = code.trim().to_string();
        }
        if let Some(notes) = &changes.notes {
            unit.notes = notes.clone();
        }
        unit.updated_at = Utc::now();

        debug!(id = %id, status = ?unit.status, "Updating unit");

        sqlx::query(
            "UPDATE item_units SET unit_code = ?2, notes = ?3, status = ?4, updated_at = ?5 WHERE id = ?1",
        )
        .bind(&unit.id)
        .bind(&unit.unit_code)
        .bind(&unit.notes)
        .bind(unit.status)
        .bind(unit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&unit.unit_code))?;

        tx.commit().await?;
        Ok(unit)
    }

    /// Deletes a unit that is not out on loan.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let unit = stock::fetch_unit(&mut tx, id).await?;

        if unit.status == UnitStatus::Loaned {
            return Err(CoreError::UnitUnavailable {
                unit_code: unit.unit_code,
                status: unit.status,
            }
            .into());
        }

        sqlx::query("DELETE FROM item_units WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, unit_code = %unit.unit_code, "Unit deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
