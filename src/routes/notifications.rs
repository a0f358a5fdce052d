use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::models::{AdminNotification, Notification};
use crate::error::AppResult;
use crate::routes::auth::{AdminUser, AuthUser};
use crate::services::notifications::NotificationService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/:id/read", post(mark_read))
}

/// Global admin feed, mounted separately under an admin prefix.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_admin_notifications))
        .route("/unread-count", get(admin_unread_count))
        .route("/:id/read", post(mark_admin_read))
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct AdminNotificationsResponse {
    pub notifications: Vec<AdminNotification>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<NotificationsResponse>> {
    let notifications = NotificationService::new(state.db.clone())
        .list_for_user(&claims.sub)
        .await?;
    Ok(Json(NotificationsResponse { notifications }))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread = NotificationService::new(state.db.clone())
        .unread_count(&claims.sub)
        .await?;
    Ok(Json(UnreadCountResponse { unread }))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> AppResult<()> {
    NotificationService::new(state.db.clone())
        .mark_read(&id, &claims.sub)
        .await
}

async fn list_admin_notifications(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<AdminNotificationsResponse>> {
    let notifications = NotificationService::new(state.db.clone()).list_admin().await?;
    Ok(Json(AdminNotificationsResponse { notifications }))
}

async fn admin_unread_count(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread = NotificationService::new(state.db.clone())
        .admin_unread_count()
        .await?;
    Ok(Json(UnreadCountResponse { unread }))
}

async fn mark_admin_read(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> AppResult<()> {
    NotificationService::new(state.db.clone())
        .mark_admin_read(&id)
        .await
}
