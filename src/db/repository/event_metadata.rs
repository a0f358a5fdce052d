use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::models::{EventMetadata, MetadataPatch, Patch};
use crate::error::{AppError, AppResult};

/// Repository for the `event_metadata` table (keyed by feed UID).
pub struct EventMetadataRepository;

impl EventMetadataRepository {
    pub async fn get(pool: &SqlitePool, event_id: &str) -> AppResult<Option<EventMetadata>> {
        let row = sqlx::query_as::<_, EventMetadata>(
            "SELECT * FROM event_metadata WHERE event_id = ?",
        )
        .bind(event_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Full metadata map in a single round trip, keyed by event id. Used by
    /// the reconciler so enrichment cost does not scale with event count.
    pub async fn get_all(pool: &SqlitePool) -> AppResult<HashMap<String, EventMetadata>> {
        let rows = sqlx::query_as::<_, EventMetadata>("SELECT * FROM event_metadata")
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.event_id.clone(), row))
            .collect())
    }

    /// Field-level upsert: ensures the row exists, then updates only the
    /// fields the patch sets or clears. `updated_at` is refreshed on every
    /// write. Repeated identical merges converge rather than accumulate.
    pub async fn merge(
        pool: &SqlitePool,
        event_id: &str,
        patch: &MetadataPatch,
    ) -> AppResult<EventMetadata> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO event_metadata (event_id, cancelled, updated_at) VALUES (?, 0, ?) \
             ON CONFLICT(event_id) DO NOTHING",
        )
        .bind(event_id)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE event_metadata SET updated_at = ");
        qb.push_bind(now);
        push_text_field(&mut qb, "chat_url", &patch.chat_url);
        push_text_field(&mut qb, "partiful_link", &patch.partiful_link);
        push_text_field(&mut qb, "insta_handle", &patch.insta_handle);
        push_text_field(&mut qb, "event_owner", &patch.event_owner);
        push_text_field(&mut qb, "owner_instagram", &patch.owner_instagram);
        push_text_field(&mut qb, "flyer_url", &patch.flyer_url);

        match &patch.cancelled {
            Patch::Keep => {}
            // `cancelled` is NOT NULL; clearing means back to the default
            Patch::Clear => {
                qb.push(", cancelled = 0");
            }
            Patch::Set(value) => {
                qb.push(", cancelled = ");
                qb.push_bind(*value);
            }
        }
        match &patch.cancelled_at {
            Patch::Keep => {}
            Patch::Clear => {
                qb.push(", cancelled_at = NULL");
            }
            Patch::Set(value) => {
                qb.push(", cancelled_at = ");
                qb.push_bind(*value);
            }
        }

        qb.push(" WHERE event_id = ");
        qb.push_bind(event_id);
        qb.build().execute(pool).await.map_err(AppError::Database)?;

        Self::get(pool, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event metadata {} not found", event_id)))
    }
}

fn push_text_field<'qb>(
    qb: &mut QueryBuilder<'qb, Sqlite>,
    column: &str,
    patch: &'qb Patch<String>,
) {
    match patch {
        Patch::Keep => {}
        Patch::Clear => {
            qb.push(format!(", {} = NULL", column));
        }
        Patch::Set(value) => {
            qb.push(format!(", {} = ", column));
            qb.push_bind(value.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn merge_creates_row_with_defaults() {
        let pool = memory_pool().await;

        let meta = EventMetadataRepository::merge(
            &pool,
            "uid-1",
            &MetadataPatch {
                chat_url: Patch::Set("https://chat.example/a".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(meta.event_id, "uid-1");
        assert_eq!(meta.chat_url.as_deref(), Some("https://chat.example/a"));
        assert!(!meta.cancelled);
        assert_eq!(meta.event_owner, None);
    }

    #[tokio::test]
    async fn merge_leaves_unrelated_fields_untouched() {
        let pool = memory_pool().await;

        EventMetadataRepository::merge(
            &pool,
            "uid-1",
            &MetadataPatch {
                event_owner: Patch::Set("alice".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let meta = EventMetadataRepository::merge(
            &pool,
            "uid-1",
            &MetadataPatch {
                chat_url: Patch::Set("https://x".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(meta.event_owner.as_deref(), Some("alice"));
        assert_eq!(meta.chat_url.as_deref(), Some("https://x"));
    }

    #[tokio::test]
    async fn merge_clear_nulls_only_the_cleared_field() {
        let pool = memory_pool().await;

        EventMetadataRepository::merge(
            &pool,
            "uid-1",
            &MetadataPatch {
                chat_url: Patch::Set("https://x".to_string()),
                event_owner: Patch::Set("alice".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let meta = EventMetadataRepository::merge(
            &pool,
            "uid-1",
            &MetadataPatch {
                chat_url: Patch::Clear,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(meta.chat_url, None);
        assert_eq!(meta.event_owner.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn get_all_returns_map_keyed_by_event_id() {
        let pool = memory_pool().await;

        for id in ["uid-1", "uid-2"] {
            EventMetadataRepository::merge(
                &pool,
                id,
                &MetadataPatch {
                    cancelled: Patch::Set(id == "uid-2"),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let all = EventMetadataRepository::get_all(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all["uid-1"].cancelled);
        assert!(all["uid-2"].cancelled);
    }
}
