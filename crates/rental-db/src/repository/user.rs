//! # User Repository
//!
//! Staff accounts. Passwords are stored as argon2 PHC strings only; the
//! plain password never leaves [`hash_password`].

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use rental_core::input::{NewUser, UserChanges};
use rental_core::{User, UserRole};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str = "id, name, email, phone, role, password_hash, created_at, updated_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Lists all users by name.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        find_user(&mut conn, id).await
    }

    /// Creates a user, hashing the password.
    pub async fn create(&self, input: &NewUser) -> DbResult<User> {
        input.validate()?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            email: normalize_email(&input.email),
            phone: input.phone.as_deref().map(|p| p.trim().to_string()),
            role: input.role,
            password_hash: hash_password(&input.password)?,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %user.id, role = ?user.role, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, role, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&user.email))?;

        info!(id = %user.id, role = ?user.role, "User created");
        Ok(user)
    }

    /// Applies a partial update. A new password is re-hashed.
    pub async fn update(&self, id: &str, changes: &UserChanges) -> DbResult<User> {
        changes.validate()?;

        let mut user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        if let Some(name) = &changes.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = &changes.email {
            user.email = normalize_email(email);
        }
        if let Some(phone) = &changes.phone {
            user.phone = phone.as_deref().map(|p| p.trim().to_string());
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(password) = &changes.password {
            user.password_hash = hash_password(password)?;
        }
        user.updated_at = Utc::now();

        debug!(id = %id, "Updating user");

        sqlx::query(
            r#"
            UPDATE users SET
                name = ?2, email = ?3, phone = ?4, role = ?5,
                password_hash = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&user.email))?;

        Ok(user)
    }

    /// Deletes a user. Users who filed reports are kept (foreign key).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "User deleted");
        Ok(())
    }
}

pub(crate) async fn find_user(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

/// IDs of every user whose role reviews damage reports.
pub(crate) async fn reviewer_ids(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
    let [first, second] = UserRole::REVIEWERS;
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM users WHERE role IN (?1, ?2) ORDER BY name")
        .bind(first)
        .bind(second)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
