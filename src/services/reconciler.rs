use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::models::EventMetadata;
use crate::db::EventMetadataRepository;
use crate::services::feed::CalendarEvent;

/// A feed event with its metadata flattened in. This is the only event
/// representation exposed to the API and the export collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
    pub location: String,
    pub chat_url: Option<String>,
    pub partiful_link: Option<String>,
    pub insta_handle: Option<String>,
    pub event_owner: Option<String>,
    pub owner_instagram: Option<String>,
    pub flyer_url: Option<String>,
    pub cancelled: bool,
}

impl MergedEvent {
    pub fn from_parts(event: CalendarEvent, metadata: Option<&EventMetadata>) -> Self {
        let (
            chat_url,
            partiful_link,
            insta_handle,
            event_owner,
            owner_instagram,
            flyer_url,
            cancelled,
        ) = match metadata {
            Some(meta) => (
                meta.chat_url.clone(),
                meta.partiful_link.clone(),
                meta.insta_handle.clone(),
                meta.event_owner.clone(),
                // Older rows may predate the derived field
                meta.owner_instagram.clone().or_else(|| {
                    meta.insta_handle
                        .as_ref()
                        .map(|handle| format!("https://instagram.com/{}", handle))
                }),
                meta.flyer_url.clone(),
                meta.cancelled,
            ),
            None => (None, None, None, None, None, None, false),
        };

        Self {
            id: event.id,
            title: event.title,
            start: event.start,
            end: event.end,
            description: event.description,
            location: event.location,
            chat_url,
            partiful_link,
            insta_handle,
            event_owner,
            owner_instagram,
            flyer_url,
            cancelled,
        }
    }
}

/// Merges feed output with the metadata store into the unified event view.
pub struct EventReconciler {
    pool: SqlitePool,
}

impl EventReconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Enrich feed events with stored metadata. One bulk read regardless of
    /// event count; input order is preserved. A failed metadata read degrades
    /// to serving the feed events with default metadata rather than failing.
    pub async fn enrich(&self, events: Vec<CalendarEvent>) -> Vec<MergedEvent> {
        let metadata = match EventMetadataRepository::get_all(&self.pool).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(
                    "Failed to load event metadata, serving feed events unenriched: {:?}",
                    e
                );
                HashMap::new()
            }
        };

        events
            .into_iter()
            .map(|event| {
                let meta = metadata.get(&event.id);
                MergedEvent::from_parts(event, meta)
            })
            .collect()
    }
}

/// The upcoming view: cancelled events never appear here, regardless of date.
pub fn upcoming(events: Vec<MergedEvent>) -> Vec<MergedEvent> {
    events.into_iter().filter(|event| !event.cancelled).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::db::models::{MetadataPatch, Patch};
    use chrono::TimeZone;

    fn feed_event(id: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            title: "Movie Night".to_string(),
            start: Utc.with_ymd_and_hms(2099, 5, 1, 19, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2099, 5, 1, 22, 0, 0).unwrap(),
            description: "Outdoor screening".to_string(),
            location: "The Park".to_string(),
        }
    }

    #[tokio::test]
    async fn event_without_metadata_gets_explicit_defaults() {
        let pool = memory_pool().await;
        let reconciler = EventReconciler::new(pool);

        let merged = reconciler.enrich(vec![feed_event("uid-1")]).await;

        assert_eq!(merged.len(), 1);
        let event = &merged[0];
        assert_eq!(event.id, "uid-1");
        assert_eq!(event.title, "Movie Night");
        assert_eq!(event.chat_url, None);
        assert_eq!(event.owner_instagram, None);
        assert!(!event.cancelled);
    }

    #[tokio::test]
    async fn matched_metadata_is_flattened_and_order_preserved() {
        let pool = memory_pool().await;

        EventMetadataRepository::merge(
            &pool,
            "uid-2",
            &MetadataPatch {
                chat_url: Patch::Set("https://chat.example/group".to_string()),
                insta_handle: Patch::Set("host".to_string()),
                owner_instagram: Patch::Set("https://instagram.com/host".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let reconciler = EventReconciler::new(pool);
        let merged = reconciler
            .enrich(vec![feed_event("uid-1"), feed_event("uid-2")])
            .await;

        assert_eq!(merged[0].id, "uid-1");
        assert_eq!(merged[1].id, "uid-2");
        assert_eq!(merged[0].chat_url, None);
        assert_eq!(merged[1].chat_url.as_deref(), Some("https://chat.example/group"));
        assert_eq!(
            merged[1].owner_instagram.as_deref(),
            Some("https://instagram.com/host")
        );
    }

    #[tokio::test]
    async fn cancelled_events_are_excluded_from_upcoming() {
        let pool = memory_pool().await;

        EventMetadataRepository::merge(
            &pool,
            "uid-1",
            &MetadataPatch {
                cancelled: Patch::Set(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let reconciler = EventReconciler::new(pool);
        let merged = reconciler
            .enrich(vec![feed_event("uid-1"), feed_event("uid-2")])
            .await;

        let visible = upcoming(merged);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "uid-2");
    }
}
