use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user-submitted request for a new calendar event, moving through the
/// pending -> approved | rejected lifecycle. Terminal states are not
/// reversible through the workflow.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventRequest {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub title: String,
    pub description: String,
    pub event_date: NaiveDate,
    pub event_time: String,
    pub location: String,
    pub flyer_url: Option<String>,
    pub status: String,
    pub admin_notes: String,
    pub created_at: NaiveDateTime,
    pub reviewed_at: Option<NaiveDateTime>,
}

/// Submission payload for a new event request. The flyer, if any, has already
/// been uploaded by the caller; only its URL travels through the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub event_time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub flyer_url: Option<String>,
}

/// The three-state lifecycle shared by event requests and event edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

/// An admin's verdict on a pending request or edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn status(&self) -> ReviewStatus {
        match self {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::Rejected => ReviewStatus::Rejected,
        }
    }
}
