use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::services::reconciler::{EventReconciler, MergedEvent};
use crate::AppState;

/// Cache-aware orchestration of fetch + reconcile.
///
/// Reads serve stale-while-revalidate: a cache hit returns immediately and
/// kicks a background refresh; a miss runs the pipeline inline. Background
/// refreshes are single-flight so the periodic worker and read-triggered
/// refreshes never overlap, but the inline miss path is never made to wait on
/// the guard.
pub struct EventFeedManager;

impl EventFeedManager {
    /// The merged event list, from cache when fresh.
    pub async fn load(state: &Arc<AppState>) -> Vec<MergedEvent> {
        if let Some(events) = state.cache.get().await {
            Self::spawn_refresh(state.clone());
            return events;
        }

        Self::refresh(state).await
    }

    /// Fetch the feed, enrich with metadata, and overwrite the cache slot.
    pub async fn refresh(state: &Arc<AppState>) -> Vec<MergedEvent> {
        let events = state.feed.fetch_events().await;
        let merged = EventReconciler::new(state.db.clone()).enrich(events).await;
        state.cache.put(merged.clone()).await;
        merged
    }

    /// Refresh in the background unless one is already in flight.
    pub fn spawn_refresh(state: Arc<AppState>) {
        if state
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        tokio::spawn(async move {
            let merged = Self::refresh(&state).await;
            tracing::debug!("Background feed refresh complete: {} events", merged.len());
            state.refresh_in_flight.store(false, Ordering::SeqCst);
        });
    }
}
