//! # Item Repository
//!
//! Database operations for rentable items.
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Who writes items.quantity / items.status                              │
//! │                                                                         │
//! │  ItemRepository::create      initial quantity, status derived          │
//! │  ItemRepository::update      manual correction (ledger::restock)       │
//! │  LoanRepository              take_one / put_back                       │
//! │  ReportRepository            hold / release                            │
//! │                                                                         │
//! │  Every write after create goes through stock::apply_stock_change,     │
//! │  so it is compared against the version that was read.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use rental_core::input::{ItemChanges, NewItem};
use rental_core::validation::validate_search_query;
use rental_core::{ledger, Item, ItemStatus, ItemUnit};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::stock::{self, ITEM_COLUMNS, UNIT_COLUMNS};
use crate::error::{DbError, DbResult};

/// List filter. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    pub category_id: Option<String>,
    pub status: Option<ItemStatus>,
    /// Case-insensitive substring of the item name.
    pub q: Option<String>,
}

/// An item together with its tracked units.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub units: Vec<ItemUnit>,
}

/// Repository for item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Lists items matching `filter`, by name.
    pub async fn list(&self, filter: &ItemFilter) -> DbResult<Vec<Item>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items WHERE 1 = 1"));

        if let Some(category_id) = &filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(q) = &filter.q {
            let q = validate_search_query(q)?;
            if !q.is_empty() {
                qb.push(" AND name LIKE ")
                    .push_bind(format!("%{}%", escape_like(&q)))
                    .push(" ESCAPE '\\'");
            }
        }
        qb.push(" ORDER BY name");

        let items = qb.build_query_as::<Item>().fetch_all(&self.pool).await?;
        debug!(count = items.len(), "Listed items");
        Ok(items)
    }

    /// Gets an item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
        let item = sqlx::query_as::<_, Item>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Gets an item with all of its units.
    pub async fn get_detail(&self, id: &str) -> DbResult<ItemDetail> {
        let item = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))?;

        let sql = format!("SELECT {UNIT_COLUMNS} FROM item_units WHERE item_id = ?1 ORDER BY unit_code");
        let units = sqlx::query_as::<_, ItemUnit>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ItemDetail { item, units })
    }

    /// Creates an item. Its status is derived from the initial quantity.
    pub async fn create(&self, input: &NewItem) -> DbResult<Item> {
        input.validate()?;

        let mut conn = self.pool.acquire().await?;
        ensure_category(&mut conn, &input.category_id).await?;

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            category_id: input.category_id.clone(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            quantity: input.quantity,
            status: ItemStatus::derive(input.quantity, false),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %item.id, name = %item.name, quantity = item.quantity, "Creating item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, category_id, name, description,
                quantity, status, version,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.category_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.status)
        .bind(item.version)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *conn)
        .await?;

        info!(id = %item.id, name = %item.name, "Item created");
        Ok(item)
    }

    /// Applies a partial update.
    ///
    /// A new `quantity` is a stock correction: the status is re-derived and
    /// an open damage-report hold survives it.
    pub async fn update(&self, id: &str, changes: &ItemChanges) -> DbResult<Item> {
        changes.validate()?;

        let mut tx = self.pool.begin().await?;
        let current = stock::fetch_item(&mut tx, id).await?;

        if let Some(category_id) = &changes.category_id {
            ensure_category(&mut tx, category_id).await?;
        }

        let name = changes
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.name)
            .to_string();
        let description = changes
            .description
            .clone()
            .unwrap_or_else(|| current.description.clone());
        let category_id = changes
            .category_id
            .clone()
            .unwrap_or_else(|| current.category_id.clone());

        debug!(id = %id, "Updating item");

        let now = Utc::now();
        sqlx::query(
            "UPDATE items SET name = ?2, description = ?3, category_id = ?4, updated_at = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(&description)
        .bind(&category_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let change = changes.quantity.map(|quantity| ledger::restock(&current, quantity));
        let mut item = Item {
            name,
            description,
            category_id,
            updated_at: now,
            ..current
        };

        if let Some(change) = &change {
            stock::apply_stock_change(&mut tx, change).await?;
            change.apply_to(&mut item);
            info!(id = %id, quantity = change.quantity, status = ?change.status, "Stock corrected");
        }

        tx.commit().await?;

        Ok(item)
    }

    /// Deletes an item that no loan or report references. Its units go with it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting item");

        let mut tx = self.pool.begin().await?;
        stock::fetch_item(&mut tx, id).await?;

        let (loans, reports): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM loans WHERE item_id = ?1),
                (SELECT COUNT(*) FROM broken_item_reports WHERE item_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if loans > 0 || reports > 0 {
            return Err(DbError::ForeignKeyViolation {
                message: format!("item is referenced by {loans} loan(s) and {reports} report(s)"),
            });
        }

        sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Item deleted");
        Ok(())
    }
}

async fn ensure_category(conn: &mut SqliteConnection, category_id: &str) -> DbResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE id = ?1")
        .bind(category_id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Category", category_id)),
    }
}

fn escape_like(q: &str) -> String {
    q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use rental_core::input::NewCategory;
    use rental_core::UserRole;

    #[tokio::test]
    async fn test_create_derives_status() {
        let db = testing::db().await;
        assert_eq!(testing::item(&db, 3).await.status, ItemStatus::Available);
        assert_eq!(testing::item(&db, 0).await.status, ItemStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_create_requires_category() {
        let db = testing::db().await;
        let input = NewItem {
            category_id: Uuid::new_v4().to_string(),
            name: "Boom mic".to_string(),
            description: None,
            quantity: 1,
        };
        assert!(matches!(
            db.items().create(&input).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = testing::db().await;
        let tripod = testing::item(&db, 2).await;
        testing::item(&db, 0).await;

        let available = db
            .items()
            .list(&ItemFilter {
                status: Some(ItemStatus::Available),
                ..ItemFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, tripod.id);

        let search = db
            .items()
            .list(&ItemFilter {
                q: Some(tripod.name[..4].to_lowercase()),
                ..ItemFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 2);

        let other = db
            .categories()
            .create(&NewCategory {
                name: "Audio".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let by_category = db
            .items()
            .list(&ItemFilter {
                category_id: Some(other.id),
                ..ItemFilter::default()
            })
            .await
            .unwrap();
        assert!(by_category.is_empty());
    }

    #[tokio::test]
    async fn test_quantity_correction_rederives_status() {
        let db = testing::db().await;
        let item = testing::item(&db, 2).await;

        let changes = ItemChanges {
            quantity: Some(0),
            ..ItemChanges::default()
        };
        let updated = db.items().update(&item.id, &changes).await.unwrap();
        assert_eq!(updated.quantity, 0);
        assert_eq!(updated.status, ItemStatus::Unavailable);
        assert_eq!(updated.version, item.version + 1);
        assert_eq!(testing::reload(&db, &item.id).await.version, updated.version);

        let renamed = db
            .items()
            .update(
                &item.id,
                &ItemChanges {
                    name: Some("Carbon tripod".to_string()),
                    ..ItemChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Carbon tripod");
        assert_eq!(renamed.version, updated.version);
    }

    #[tokio::test]
    async fn test_detail_includes_units() {
        let db = testing::db().await;
        let item = testing::item(&db, 2).await;
        testing::unit(&db, &item.id, "TRI-002").await;
        testing::unit(&db, &item.id, "TRI-001").await;

        let detail = db.items().get_detail(&item.id).await.unwrap();
        let codes: Vec<_> = detail.units.iter().map(|u| u.unit_code.as_str()).collect();
        assert_eq!(codes, ["TRI-001", "TRI-002"]);
    }

    #[tokio::test]
    async fn test_delete_rejected_while_referenced() {
        let db = testing::db().await;
        let reporter = testing::user(&db, UserRole::Staff).await;

        let rented = testing::item(&db, 1).await;
        let loan = db.loans().create(&testing::new_loan(&rented.id)).await.unwrap();
        let err = db.items().delete(&rented.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        // Closed loans still reference the item
        db.loans().return_loan(&loan.id).await.unwrap();
        assert!(db.items().delete(&rented.id).await.is_err());

        let damaged = testing::item(&db, 1).await;
        db.reports()
            .report(&testing::new_report(&damaged.id, &reporter.id))
            .await
            .unwrap();
        let err = db.items().delete(&damaged.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(db.items().get_by_id(&damaged.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_takes_units_along() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;
        let unit = testing::unit(&db, &item.id, "TRI-009").await;

        db.items().delete(&item.id).await.unwrap();
        assert!(db.items().get_by_id(&item.id).await.unwrap().is_none());
        assert!(db.units().get_by_id(&unit.id).await.unwrap().is_none());

        let err = db.items().delete(&item.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
