use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::models::{CreateEventEdit, EventEdit};
use crate::db::EventEditRepository;
use crate::error::AppResult;
use crate::routes::auth::{AdminUser, AuthUser};
use crate::routes::requests::{DecisionBody, SubmitResponse};
use crate::services::workflow::WorkflowService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(submit_edit))
        .route("/mine", get(my_edits))
        .route("/pending", get(pending_edits))
        .route("/:id/decision", post(decide_edit))
}

#[derive(Debug, Serialize)]
pub struct EditsResponse {
    pub edits: Vec<EventEdit>,
}

/// Propose an edit to an existing feed event. Not rate limited.
async fn submit_edit(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(body): Json<CreateEventEdit>,
) -> AppResult<Json<SubmitResponse>> {
    let workflow = WorkflowService::from_state(&state);
    let id = workflow
        .submit_edit(body, &claims.sub, &claims.email)
        .await?;
    Ok(Json(SubmitResponse { id }))
}

async fn my_edits(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<EditsResponse>> {
    let edits = EventEditRepository::list_for_user(&state.db, &claims.sub).await?;
    Ok(Json(EditsResponse { edits }))
}

async fn pending_edits(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<EditsResponse>> {
    let edits = EventEditRepository::list_pending(&state.db).await?;
    Ok(Json(EditsResponse { edits }))
}

async fn decide_edit(
    State(state): State<Arc<AppState>>,
    AdminUser(claims): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> AppResult<()> {
    let workflow = WorkflowService::from_state(&state);
    workflow
        .decide_edit(&id, body.status, &body.admin_notes, claims.admin)
        .await?;

    // An approved edit changes the merged view
    state.cache.clear().await;

    Ok(())
}
