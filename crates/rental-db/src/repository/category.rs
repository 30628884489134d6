//! # Category Repository
//!
//! Plain CRUD for item categories. Names are unique.

use chrono::Utc;
use rental_core::input::{CategoryChanges, NewCategory};
use rental_core::Category;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists all categories by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name");
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }

    /// Gets a category by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    /// Creates a category.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a blank or overlong name
    /// - `UniqueViolation` if the name is taken
    pub async fn create(&self, input: &NewCategory) -> DbResult<Category> {
        input.validate()?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %category.id, name = %category.name, "Creating category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&category.name))?;

        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, changes: &CategoryChanges) -> DbResult<Category> {
        changes.validate()?;

        let mut category = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;

        if let Some(name) = &changes.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = &changes.description {
            category.description = description.clone();
        }
        category.updated_at = Utc::now();

        debug!(id = %id, "Updating category");

        sqlx::query("UPDATE categories SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_value(&category.name))?;

        Ok(category)
    }

    /// Deletes a category that no item references.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting category");

        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE category_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if in_use > 0 {
            return Err(DbError::ForeignKeyViolation {
                message: format!("category still has {in_use} item(s)"),
            });
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        info!(id = %id, "Category deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;

    fn cameras() -> NewCategory {
        NewCategory {
            name: "Cameras".to_string(),
            description: Some("Bodies and lenses".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = testing::db().await;
        let created = db.categories().create(&cameras()).await.unwrap();

        let all = db.categories().list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let db = testing::db().await;
        db.categories().create(&cameras()).await.unwrap();

        let err = db.categories().create(&cameras()).await.unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "name");
                assert_eq!(value, "Cameras");
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_clears_description() {
        let db = testing::db().await;
        let created = db.categories().create(&cameras()).await.unwrap();

        let changes = CategoryChanges {
            name: Some("Photo".to_string()),
            description: Some(None),
        };
        let updated = db.categories().update(&created.id, &changes).await.unwrap();
        assert_eq!(updated.name, "Photo");
        assert!(updated.description.is_none());
    }

    #[tokio::test]
    async fn test_delete_in_use_is_rejected() {
        let db = testing::db().await;
        let item = testing::item(&db, 1).await;

        let err = db.categories().delete(&item.category_id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        db.items().delete(&item.id).await.unwrap();
        db.categories().delete(&item.category_id).await.unwrap();
        assert!(matches!(
            db.categories().delete(&item.category_id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
