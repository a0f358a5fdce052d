use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::GoingRecord;
use crate::error::AppResult;
use crate::routes::auth::{AdminUser, AuthUser};
use crate::services::attendance::AttendanceService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:event_id/toggle", post(toggle_going))
        .route("/:event_id/attendees", get(event_attendees))
        .route("/counts", get(going_counts))
        .route("/mine", get(my_going_status))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EventIdsQuery {
    /// Comma-separated feed UIDs.
    pub event_ids: String,
}

impl EventIdsQuery {
    fn ids(&self) -> Vec<String> {
        self.event_ids
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub going: bool,
}

#[derive(Debug, Serialize)]
pub struct CountsResponse {
    pub counts: HashMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: HashMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct AttendeesResponse {
    pub attendees: Vec<GoingRecord>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Flip the caller's going state for an event and return the new state.
async fn toggle_going(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(event_id): Path<String>,
) -> AppResult<Json<ToggleResponse>> {
    let attendance = AttendanceService::new(state.db.clone());
    let going = attendance
        .toggle(&event_id, &claims.sub, claims.display_name())
        .await?;
    Ok(Json(ToggleResponse { going }))
}

/// Who is going, for the admin dashboard.
async fn event_attendees(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(event_id): Path<String>,
) -> AppResult<Json<AttendeesResponse>> {
    let attendance = AttendanceService::new(state.db.clone());
    let attendees = attendance.attendees(&event_id).await?;
    Ok(Json(AttendeesResponse { attendees }))
}

/// Going counts per event, for the listing badges. Public.
async fn going_counts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventIdsQuery>,
) -> AppResult<Json<CountsResponse>> {
    let attendance = AttendanceService::new(state.db.clone());
    let counts = attendance.counts_for(&query.ids()).await?;
    Ok(Json(CountsResponse { counts }))
}

/// The caller's going state per event.
async fn my_going_status(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(query): Query<EventIdsQuery>,
) -> AppResult<Json<StatusResponse>> {
    let attendance = AttendanceService::new(state.db.clone());
    let status = attendance.status_for(&query.ids(), &claims.sub).await?;
    Ok(Json(StatusResponse { status }))
}
