use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::services::reconciler::MergedEvent;

struct CacheEntry {
    events: Vec<MergedEvent>,
    fetched_at: Instant,
}

/// Single-slot, time-boxed cache of the merged event list.
///
/// There is no per-event caching and no versioning: `put` overwrites the slot
/// and last-write-wins, which is acceptable because every refresh is trying to
/// obtain fresher data than the last. An entry past its TTL is treated as
/// absent and evicted on read.
pub struct EventCache {
    ttl: Duration,
    slot: RwLock<Option<CacheEntry>>,
}

impl EventCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// The cached list, or `None` when the slot is empty or expired.
    /// Expired entries are evicted here so they are never partially trusted.
    pub async fn get(&self) -> Option<Vec<MergedEvent>> {
        {
            let guard = self.slot.read().await;
            match guard.as_ref() {
                None => return None,
                Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                    return Some(entry.events.clone());
                }
                Some(_) => {}
            }
        }

        let mut guard = self.slot.write().await;
        if let Some(entry) = guard.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                // A refresh landed between the read and write locks
                return Some(entry.events.clone());
            }
            *guard = None;
        }
        None
    }

    pub async fn put(&self, events: Vec<MergedEvent>) {
        self.put_at(events, Instant::now()).await;
    }

    async fn put_at(&self, events: Vec<MergedEvent>, fetched_at: Instant) {
        *self.slot.write().await = Some(CacheEntry { events, fetched_at });
    }

    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_events() -> Vec<MergedEvent> {
        vec![MergedEvent {
            id: "uid-1".to_string(),
            title: "Karaoke Night".to_string(),
            start: Utc.with_ymd_and_hms(2099, 1, 1, 20, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2099, 1, 1, 23, 0, 0).unwrap(),
            description: String::new(),
            location: String::new(),
            chat_url: None,
            partiful_link: None,
            insta_handle: None,
            event_owner: None,
            owner_instagram: None,
            flyer_url: None,
            cancelled: false,
        }]
    }

    #[tokio::test]
    async fn entry_within_ttl_is_served() {
        let cache = EventCache::new(Duration::from_millis(300));
        cache
            .put_at(sample_events(), Instant::now() - Duration::from_millis(299))
            .await;

        let hit = cache.get().await;
        assert_eq!(hit.map(|events| events.len()), Some(1));
    }

    #[tokio::test]
    async fn expired_entry_is_absent_and_eviction_is_permanent() {
        let cache = EventCache::new(Duration::from_millis(300));
        cache
            .put_at(sample_events(), Instant::now() - Duration::from_millis(301))
            .await;

        assert!(cache.get().await.is_none());
        // The expired entry was evicted, not just skipped
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_and_clear_empties() {
        let cache = EventCache::new(Duration::from_secs(300));
        cache.put(Vec::new()).await;
        assert_eq!(cache.get().await.map(|events| events.len()), Some(0));

        cache.put(sample_events()).await;
        assert_eq!(cache.get().await.map(|events| events.len()), Some(1));

        cache.clear().await;
        assert!(cache.get().await.is_none());
    }
}
