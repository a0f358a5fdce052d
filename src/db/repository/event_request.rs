use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateEventRequest, EventRequest, ReviewStatus};
use crate::error::{AppError, AppResult};

/// Repository for the `event_requests` table.
pub struct EventRequestRepository;

impl EventRequestRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        user_email: &str,
        data: &CreateEventRequest,
    ) -> AppResult<EventRequest> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let request = sqlx::query_as::<_, EventRequest>(
            r#"
            INSERT INTO event_requests (
                id, user_id, user_email, title, description,
                event_date, event_time, location, flyer_url,
                status, admin_notes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', '', ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(user_email)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.event_date)
        .bind(&data.event_time)
        .bind(&data.location)
        .bind(&data.flyer_url)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(request)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<EventRequest>> {
        let row = sqlx::query_as::<_, EventRequest>("SELECT * FROM event_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_pending(pool: &SqlitePool) -> AppResult<Vec<EventRequest>> {
        let rows = sqlx::query_as::<_, EventRequest>(
            "SELECT * FROM event_requests WHERE status = 'pending' ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<EventRequest>> {
        let rows = sqlx::query_as::<_, EventRequest>(
            "SELECT * FROM event_requests WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Count of a user's requests with `created_at` in `[start, end)`.
    /// Backs the daily submission limit.
    pub async fn count_for_user_between(
        pool: &SqlitePool,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_requests \
             WHERE user_id = ? AND created_at >= ? AND created_at < ?",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(count)
    }

    /// Stamp the admin's verdict on a request.
    pub async fn set_review(
        pool: &SqlitePool,
        id: &str,
        status: ReviewStatus,
        admin_notes: &str,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "UPDATE event_requests SET status = ?, admin_notes = ?, reviewed_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(admin_notes)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM event_requests WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }
}
