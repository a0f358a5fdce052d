use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Attendance marker: the existence of a row for `(event_id, user_id)` is the
/// "going" state. There is no boolean column to flip.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GoingRecord {
    pub event_id: String,
    pub user_id: String,
    pub user_name: String,
    pub created_at: NaiveDateTime,
}
