use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{CreateEventRequest, EventRequest, ReviewDecision};
use crate::db::EventRequestRepository;
use crate::error::AppResult;
use crate::routes::auth::{AdminUser, AuthUser};
use crate::services::workflow::WorkflowService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(submit_request))
        .route("/mine", get(my_requests))
        .route("/pending", get(pending_requests))
        .route("/:id/decision", post(decide_request))
        .route("/:id", delete(delete_request))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub status: ReviewDecision,
    #[serde(default)]
    pub admin_notes: String,
}

#[derive(Debug, Serialize)]
pub struct RequestsResponse {
    pub requests: Vec<EventRequest>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a new-event request, subject to the daily cap.
async fn submit_request(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(body): Json<CreateEventRequest>,
) -> AppResult<Json<SubmitResponse>> {
    let workflow = WorkflowService::from_state(&state);
    let id = workflow
        .submit_request(body, &claims.sub, &claims.email)
        .await?;
    Ok(Json(SubmitResponse { id }))
}

async fn my_requests(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<RequestsResponse>> {
    let requests = EventRequestRepository::list_for_user(&state.db, &claims.sub).await?;
    Ok(Json(RequestsResponse { requests }))
}

/// The admin review queue.
async fn pending_requests(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<RequestsResponse>> {
    let requests = EventRequestRepository::list_pending(&state.db).await?;
    Ok(Json(RequestsResponse { requests }))
}

async fn decide_request(
    State(state): State<Arc<AppState>>,
    AdminUser(claims): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> AppResult<()> {
    let workflow = WorkflowService::from_state(&state);
    workflow
        .decide_request(&id, body.status, &body.admin_notes, claims.admin)
        .await
}

/// Owners can delete their own approved requests.
async fn delete_request(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> AppResult<()> {
    let workflow = WorkflowService::from_state(&state);
    workflow.delete_request(&id, &claims.sub).await
}
