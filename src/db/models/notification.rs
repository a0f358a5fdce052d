use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// In-app notification for a single user. Append-only; only the read flag and
/// its timestamp are ever updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    /// Points at the request, edit, or event the notification is about.
    pub related_id: Option<String>,
    pub read: bool,
    pub created_at: NaiveDateTime,
    pub read_at: Option<NaiveDateTime>,
}

/// Global notification for the admin review queue.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AdminNotification {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
    /// Email of the user whose submission triggered the notification.
    pub from_email: Option<String>,
    pub read: bool,
    pub created_at: NaiveDateTime,
    pub read_at: Option<NaiveDateTime>,
}
