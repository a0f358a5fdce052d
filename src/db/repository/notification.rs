use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{AdminNotification, Notification};
use crate::error::{AppError, AppResult};

/// Repository for the `user_notifications` table.
pub struct UserNotificationRepository;

impl UserNotificationRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        kind: &str,
        title: &str,
        message: &str,
        related_id: Option<&str>,
    ) -> AppResult<Notification> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO user_notifications (id, user_id, kind, title, message, related_id, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .bind(related_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(notification)
    }

    pub async fn list_recent(
        pool: &SqlitePool,
        user_id: &str,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM user_notifications WHERE user_id = ? \
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Set the read flag, stamping `read_at` only on the first call so
    /// repeated marks are idempotent. Returns whether the row exists.
    pub async fn mark_read(pool: &SqlitePool, id: &str, user_id: &str) -> AppResult<bool> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            "UPDATE user_notifications SET read = 1, read_at = COALESCE(read_at, ?) \
             WHERE id = ? AND user_id = ?",
        )
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn unread_count(pool: &SqlitePool, user_id: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_notifications WHERE user_id = ? AND read = 0",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(count)
    }
}

/// Repository for the `admin_notifications` table (global scope).
pub struct AdminNotificationRepository;

impl AdminNotificationRepository {
    pub async fn create(
        pool: &SqlitePool,
        kind: &str,
        title: &str,
        message: &str,
        related_id: Option<&str>,
        from_email: Option<&str>,
    ) -> AppResult<AdminNotification> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let notification = sqlx::query_as::<_, AdminNotification>(
            r#"
            INSERT INTO admin_notifications (id, kind, title, message, related_id, from_email, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .bind(related_id)
        .bind(from_email)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(notification)
    }

    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> AppResult<Vec<AdminNotification>> {
        let rows = sqlx::query_as::<_, AdminNotification>(
            "SELECT * FROM admin_notifications ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn mark_read(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            "UPDATE admin_notifications SET read = 1, read_at = COALESCE(read_at, ?) WHERE id = ?",
        )
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn unread_count(pool: &SqlitePool) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM admin_notifications WHERE read = 0")
                .fetch_one(pool)
                .await
                .map_err(AppError::Database)?;

        Ok(count)
    }
}
