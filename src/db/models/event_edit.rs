use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::models::MetadataPatch;

/// A proposed edit to an existing feed event's metadata. The snapshot of the
/// event at submission time and the proposed patch are stored as JSON; the
/// patch is only applied to the metadata store on approval.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventEdit {
    pub id: String,
    /// Feed UID of the event being edited (not a request id).
    pub event_id: String,
    pub user_id: String,
    pub user_email: String,
    /// JSON snapshot of the merged event as the submitter saw it.
    pub original_event: String,
    /// JSON-serialized [`MetadataPatch`].
    pub proposed_changes: String,
    pub status: String,
    pub admin_notes: String,
    pub created_at: NaiveDateTime,
    pub reviewed_at: Option<NaiveDateTime>,
}

impl EventEdit {
    pub fn changes(&self) -> serde_json::Result<MetadataPatch> {
        serde_json::from_str(&self.proposed_changes)
    }

    /// Event title from the stored snapshot, for notification copy.
    pub fn snapshot_title(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.original_event)
            .ok()
            .and_then(|v| v.get("title").and_then(|t| t.as_str().map(str::to_string)))
            .unwrap_or_else(|| "Unknown Event".to_string())
    }
}

/// Submission payload for an edit proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventEdit {
    pub event_id: String,
    /// Snapshot of the event at submission time, kept for admin review.
    pub original_event: serde_json::Value,
    pub changes: MetadataPatch,
}
