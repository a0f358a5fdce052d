use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::GoingRecord;
use crate::error::{AppError, AppResult};

/// Repository for the `event_going` table. Membership is the state: a row
/// exists iff the user is going.
pub struct GoingRepository;

impl GoingRepository {
    /// Conditional create: inserts the membership row unless it already
    /// exists. Returns whether a row was inserted. The conditional write is
    /// what keeps two interleaved toggles from both observing "create".
    pub async fn insert_if_absent(
        pool: &SqlitePool,
        event_id: &str,
        user_id: &str,
        user_name: &str,
    ) -> AppResult<bool> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            "INSERT INTO event_going (event_id, user_id, user_name, created_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(event_id, user_id) DO NOTHING",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(user_name)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(pool: &SqlitePool, event_id: &str, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM event_going WHERE event_id = ? AND user_id = ?")
            .bind(event_id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn exists(pool: &SqlitePool, event_id: &str, user_id: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_going WHERE event_id = ? AND user_id = ?",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(count > 0)
    }

    pub async fn find_for_event(pool: &SqlitePool, event_id: &str) -> AppResult<Vec<GoingRecord>> {
        let rows = sqlx::query_as::<_, GoingRecord>(
            "SELECT * FROM event_going WHERE event_id = ? ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn count_for_event(pool: &SqlitePool, event_id: &str) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_going WHERE event_id = ?")
                .bind(event_id)
                .fetch_one(pool)
                .await
                .map_err(AppError::Database)?;

        Ok(count)
    }

    /// Remove every membership row for an event. Used by the cancellation
    /// fan-out, which clears attendance state entirely.
    pub async fn delete_for_event(pool: &SqlitePool, event_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM event_going WHERE event_id = ?")
            .bind(event_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}
