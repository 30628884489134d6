//! # Notification Repository
//!
//! Notifications are rows, written inside the transaction of the change
//! that caused them (the same way an outbox row would be). Getting them to
//! the user's inbox or phone is somebody else's job; this repository only
//! stores, lists and marks them read.

use chrono::Utc;
use rental_core::{Notification, NotificationKind};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, subject_type, subject_id, message, created_at, read_at";

/// Repository for stored notifications.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Creates a new NotificationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Lists a user's notifications, newest first.
    pub async fn list_for_user(&self, user_id: &str, unread_only: bool) -> DbResult<Vec<Notification>> {
        let user: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if user.is_none() {
            return Err(DbError::not_found("User", user_id));
        }

        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = ?1 AND (?2 = 0 OR read_at IS NULL) \
             ORDER BY created_at DESC"
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .fetch_all(&self.pool)
            .await?;

        Ok(notifications)
    }

    /// Marks a notification read. Reading it twice keeps the first time.
    pub async fn mark_read(&self, id: &str) -> DbResult<Notification> {
        let result = sqlx::query("UPDATE notifications SET read_at = COALESCE(read_at, ?2) WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }

        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
        let notification = sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(notification)
    }
}

/// A notification waiting to be written.
pub(crate) struct Notice<'a> {
    pub kind: NotificationKind,
    pub subject_type: &'a str,
    pub subject_id: &'a str,
    pub message: String,
}

/// Writes one notification per recipient on the caller's connection.
///
/// Duplicate recipients are written once.
pub(crate) async fn notify(
    conn: &mut SqliteConnection,
    recipients: &[String],
    notice: &Notice<'_>,
) -> DbResult<usize> {
    let mut sent: Vec<&str> = Vec::with_capacity(recipients.len());

    for user_id in recipients {
        if sent.contains(&user_id.as_str()) {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, subject_type, subject_id, message, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(notice.kind)
        .bind(notice.subject_type)
        .bind(notice.subject_id)
        .bind(&notice.message)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        sent.push(user_id);
    }

    debug!(
        kind = ?notice.kind,
        subject_id = %notice.subject_id,
        recipients = sent.len(),
        "Notifications stored"
    );
    Ok(sent.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use rental_core::UserRole;

    #[tokio::test]
    async fn test_notify_dedupes_and_mark_read() {
        let db = testing::db().await;
        let user = testing::user(&db, UserRole::Admin).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let notice = Notice {
            kind: NotificationKind::ReportFiled,
            subject_type: "broken_item_report",
            subject_id: "r-1",
            message: "Tripod reported broken".to_string(),
        };
        let written = notify(&mut conn, &[user.id.clone(), user.id.clone()], &notice)
            .await
            .unwrap();
        drop(conn);
        assert_eq!(written, 1);

        let unread = db.notifications().list_for_user(&user.id, true).await.unwrap();
        assert_eq!(unread.len(), 1);

        let read = db.notifications().mark_read(&unread[0].id).await.unwrap();
        let first_read_at = read.read_at.unwrap();
        let again = db.notifications().mark_read(&read.id).await.unwrap();
        assert_eq!(again.read_at, Some(first_read_at));

        assert!(db.notifications().list_for_user(&user.id, true).await.unwrap().is_empty());
        assert_eq!(db.notifications().list_for_user(&user.id, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let db = testing::db().await;
        assert!(matches!(
            db.notifications().list_for_user("nobody", false).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.notifications().mark_read("nothing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
