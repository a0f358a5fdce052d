use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{EventMetadata, MetadataPatch};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AdminUser;
use crate::services::events::EventFeedManager;
use crate::services::export::{finalize_for_export, DateRange};
use crate::services::reconciler::{upcoming, MergedEvent};
use crate::services::workflow::WorkflowService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_events))
        .route("/refresh", post(refresh_events))
        .route("/export", get(export_events))
        .route("/subscribe-url", get(subscribe_url))
        .route("/:id/metadata", put(apply_metadata))
        .route("/:id/cancel", post(cancel_event))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    /// Admin-only: include cancelled events in the listing.
    #[serde(default)]
    pub include_cancelled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<MergedEvent>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelEventBody {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct CancelEventResponse {
    pub notified_count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Upcoming merged events. Served from cache when fresh, with a background
/// refresh kicked on every cache hit.
async fn list_events(
    State(state): State<Arc<AppState>>,
    admin: Option<AdminUser>,
    Query(query): Query<ListEventsQuery>,
) -> Json<EventsResponse> {
    let merged = EventFeedManager::load(&state).await;

    let events = if query.include_cancelled && admin.is_some() {
        merged
    } else {
        upcoming(merged)
    };

    Json(EventsResponse { events })
}

/// Drop the cache and refetch immediately.
async fn refresh_events(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Json<EventsResponse> {
    state.cache.clear().await;
    let merged = EventFeedManager::refresh(&state).await;
    Json(EventsResponse {
        events: upcoming(merged),
    })
}

/// The finalized payload for the export collaborator: filtered, sorted, and
/// stripped of cancelled events.
async fn export_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Json<EventsResponse>> {
    let range = match (query.from, query.to) {
        (Some(start), Some(end)) => {
            if end < start {
                return Err(AppError::BadRequest(
                    "Export range end precedes start".to_string(),
                ));
            }
            Some(DateRange { start, end })
        }
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "Export range requires both from and to".to_string(),
            ));
        }
    };

    let merged = EventFeedManager::load(&state).await;
    let events = finalize_for_export(&merged, range.as_ref());
    Ok(Json(EventsResponse { events }))
}

async fn subscribe_url(State(state): State<Arc<AppState>>) -> Json<SubscribeUrlResponse> {
    Json(SubscribeUrlResponse {
        url: state.feed.add_to_calendar_url(),
    })
}

/// Direct admin apply: writes the patch straight to the metadata store,
/// bypassing the review queue.
async fn apply_metadata(
    State(state): State<Arc<AppState>>,
    AdminUser(claims): AdminUser,
    Path(event_id): Path<String>,
    Json(patch): Json<MetadataPatch>,
) -> AppResult<Json<EventMetadata>> {
    let workflow = WorkflowService::from_state(&state);
    let metadata = workflow
        .apply_direct(&event_id, patch, claims.admin)
        .await?;

    // Stale merged view would otherwise survive until TTL
    state.cache.clear().await;

    Ok(Json(metadata))
}

/// Cancel an event: flags the metadata and notifies everyone who was going.
async fn cancel_event(
    State(state): State<Arc<AppState>>,
    AdminUser(claims): AdminUser,
    Path(event_id): Path<String>,
    Json(body): Json<CancelEventBody>,
) -> AppResult<Json<CancelEventResponse>> {
    let workflow = WorkflowService::from_state(&state);
    let notified_count = workflow
        .cancel_event(&event_id, &body.title, claims.admin)
        .await?;

    state.cache.clear().await;

    Ok(Json(CancelEventResponse { notified_count }))
}
