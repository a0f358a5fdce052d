use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateEventEdit, EventEdit, ReviewStatus};
use crate::error::{AppError, AppResult};

/// Repository for the `event_edits` table.
pub struct EventEditRepository;

impl EventEditRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        user_email: &str,
        data: &CreateEventEdit,
    ) -> AppResult<EventEdit> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let original_event = serde_json::to_string(&data.original_event)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        let proposed_changes = serde_json::to_string(&data.changes)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

        let edit = sqlx::query_as::<_, EventEdit>(
            r#"
            INSERT INTO event_edits (
                id, event_id, user_id, user_email,
                original_event, proposed_changes,
                status, admin_notes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 'pending', '', ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&data.event_id)
        .bind(user_id)
        .bind(user_email)
        .bind(&original_event)
        .bind(&proposed_changes)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(edit)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<EventEdit>> {
        let row = sqlx::query_as::<_, EventEdit>("SELECT * FROM event_edits WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_pending(pool: &SqlitePool) -> AppResult<Vec<EventEdit>> {
        let rows = sqlx::query_as::<_, EventEdit>(
            "SELECT * FROM event_edits WHERE status = 'pending' ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<EventEdit>> {
        let rows = sqlx::query_as::<_, EventEdit>(
            "SELECT * FROM event_edits WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn set_review(
        pool: &SqlitePool,
        id: &str,
        status: ReviewStatus,
        admin_notes: &str,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "UPDATE event_edits SET status = ?, admin_notes = ?, reviewed_at = ? WHERE id = ?",
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
}
