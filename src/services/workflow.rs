use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::db::models::{
    CreateEventEdit, CreateEventRequest, EventMetadata, MetadataPatch, Patch, ReviewDecision,
    ReviewStatus,
};
use crate::db::{EventEditRepository, EventMetadataRepository, EventRequestRepository};
use crate::error::{AppError, AppResult};
use crate::services::attendance::AttendanceService;
use crate::services::email::{AdminEmail, Mailer};
use crate::services::notifications::{NotificationKind, NotificationService};

/// The request/approval engine: user submissions move pending -> approved or
/// pending -> rejected, with notification fan-out on every transition and a
/// daily submission cap. Admins bypass the queue entirely via direct apply.
///
/// Authorization is the caller's responsibility; the engine only trusts the
/// `is_admin` flag it is handed.
pub struct WorkflowService {
    pool: SqlitePool,
    notifications: NotificationService,
    mailer: Arc<dyn Mailer>,
    max_requests_per_day: u32,
}

impl WorkflowService {
    pub fn new(pool: SqlitePool, mailer: Arc<dyn Mailer>, max_requests_per_day: u32) -> Self {
        let notifications = NotificationService::new(pool.clone());
        Self {
            pool,
            notifications,
            mailer,
            max_requests_per_day,
        }
    }

    pub fn from_state(state: &Arc<crate::AppState>) -> Self {
        Self::new(
            state.db.clone(),
            state.mailer.clone(),
            state.config.moderation.max_requests_per_day,
        )
    }

    // ------------------------------------------------------------------
    // New-event requests
    // ------------------------------------------------------------------

    /// Submit a new-event request. Enforces the daily cap by counting the
    /// user's requests created in the current local calendar day; the count
    /// and the insert are not transactional, so the limit is soft under
    /// concurrent submissions.
    pub async fn submit_request(
        &self,
        data: CreateEventRequest,
        user_id: &str,
        user_email: &str,
    ) -> AppResult<String> {
        if data.title.trim().is_empty() {
            return Err(AppError::Validation("Event title is required".to_string()));
        }

        let (window_start, window_end) = local_day_window(Local::now());
        let submitted_today = EventRequestRepository::count_for_user_between(
            &self.pool,
            user_id,
            window_start,
            window_end,
        )
        .await?;

        if submitted_today >= self.max_requests_per_day as i64 {
            return Err(AppError::RateLimited(format!(
                "You've reached the daily limit of {} event requests. Please try again tomorrow.",
                self.max_requests_per_day
            )));
        }

        let request =
            EventRequestRepository::create(&self.pool, user_id, user_email, &data).await?;

        self.notifications
            .notify_admin(
                NotificationKind::EventRequest,
                "New Event Request",
                &format!(
                    "{} submitted a new event request: \"{}\"",
                    user_email, request.title
                ),
                Some(&request.id),
                Some(user_email),
            )
            .await;

        self.dispatch_email(AdminEmail::for_request(&request));

        Ok(request.id)
    }

    /// Approve or reject a pending request. Rejection requires non-empty
    /// notes, enforced here rather than in the UI. Terminal states are not
    /// reversible.
    pub async fn decide_request(
        &self,
        request_id: &str,
        decision: ReviewDecision,
        admin_notes: &str,
        is_admin: bool,
    ) -> AppResult<()> {
        if !is_admin {
            return Err(AppError::Forbidden);
        }

        let request = EventRequestRepository::find_by_id(&self.pool, request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event request {} not found", request_id)))?;

        if request.status != ReviewStatus::Pending.as_str() {
            return Err(AppError::Conflict(format!(
                "Event request {} has already been reviewed",
                request_id
            )));
        }

        let notes = admin_notes.trim();
        if decision == ReviewDecision::Rejected && notes.is_empty() {
            return Err(AppError::Validation(
                "Rejecting a request requires admin notes".to_string(),
            ));
        }

        EventRequestRepository::set_review(&self.pool, request_id, decision.status(), notes)
            .await?;

        // The status change is authoritative; notification failure must not
        // roll it back (notify swallows errors).
        match decision {
            ReviewDecision::Approved => {
                self.notifications
                    .notify(
                        &request.user_id,
                        NotificationKind::RequestApproved,
                        "Event Request Approved",
                        &format!(
                            "Your event request \"{}\" has been approved!",
                            request.title
                        ),
                        Some(request_id),
                    )
                    .await;
            }
            ReviewDecision::Rejected => {
                self.notifications
                    .notify(
                        &request.user_id,
                        NotificationKind::RequestRejected,
                        "Event Request Rejected",
                        &format!(
                            "Your event request \"{}\" was rejected. Reason: {}",
                            request.title, notes
                        ),
                        Some(request_id),
                    )
                    .await;
            }
        }

        Ok(())
    }

    /// Owners may delete their own requests once approved ("I saw it landed
    /// on the calendar, remove the record").
    pub async fn delete_request(&self, request_id: &str, user_id: &str) -> AppResult<()> {
        let request = EventRequestRepository::find_by_id(&self.pool, request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event request {} not found", request_id)))?;

        if request.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        if request.status != ReviewStatus::Approved.as_str() {
            return Err(AppError::Conflict(
                "Only approved requests can be deleted".to_string(),
            ));
        }

        EventRequestRepository::delete(&self.pool, request_id).await
    }

    // ------------------------------------------------------------------
    // Edit proposals
    // ------------------------------------------------------------------

    /// Submit an edit proposal for an existing feed event. No rate limit.
    pub async fn submit_edit(
        &self,
        data: CreateEventEdit,
        user_id: &str,
        user_email: &str,
    ) -> AppResult<String> {
        if data.changes.is_empty() {
            return Err(AppError::Validation(
                "Edit proposes no changes".to_string(),
            ));
        }

        let edit = EventEditRepository::create(&self.pool, user_id, user_email, &data).await?;
        let event_title = edit.snapshot_title();

        self.notifications
            .notify_admin(
                NotificationKind::EventEdit,
                "New Edit Request",
                &format!("{} requested to edit \"{}\"", user_email, event_title),
                Some(&edit.id),
                Some(user_email),
            )
            .await;

        self.dispatch_email(AdminEmail::for_edit(user_email, &event_title, &edit.id));

        Ok(edit.id)
    }

    /// Approve or reject a pending edit. On approval the proposed patch is
    /// normalized and merged into the metadata store before the status flips.
    pub async fn decide_edit(
        &self,
        edit_id: &str,
        decision: ReviewDecision,
        admin_notes: &str,
        is_admin: bool,
    ) -> AppResult<()> {
        if !is_admin {
            return Err(AppError::Forbidden);
        }

        let edit = EventEditRepository::find_by_id(&self.pool, edit_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event edit {} not found", edit_id)))?;

        if edit.status != ReviewStatus::Pending.as_str() {
            return Err(AppError::Conflict(format!(
                "Event edit {} has already been reviewed",
                edit_id
            )));
        }

        let notes = admin_notes.trim();
        if decision == ReviewDecision::Rejected && notes.is_empty() {
            return Err(AppError::Validation(
                "Rejecting an edit requires admin notes".to_string(),
            ));
        }

        if decision == ReviewDecision::Approved {
            let patch = edit
                .changes()
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
            let patch = normalize_patch(patch);
            EventMetadataRepository::merge(&self.pool, &edit.event_id, &patch).await?;
        }

        EventEditRepository::set_review(&self.pool, edit_id, decision.status(), notes).await?;

        match decision {
            ReviewDecision::Approved => {
                self.notifications
                    .notify(
                        &edit.user_id,
                        NotificationKind::EditApproved,
                        "Edit Request Approved",
                        "Your edit request has been approved and applied!",
                        Some(edit_id),
                    )
                    .await;
            }
            ReviewDecision::Rejected => {
                self.notifications
                    .notify(
                        &edit.user_id,
                        NotificationKind::EditRejected,
                        "Edit Request Rejected",
                        &format!("Your edit request was rejected. Reason: {}", notes),
                        Some(edit_id),
                    )
                    .await;
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Direct admin apply
    // ------------------------------------------------------------------

    /// Write a metadata patch straight through, skipping the review queue, so
    /// admins never wait on their own moderation. Safe to repeat: merge
    /// semantics make identical applies converge.
    pub async fn apply_direct(
        &self,
        event_id: &str,
        patch: MetadataPatch,
        is_admin: bool,
    ) -> AppResult<EventMetadata> {
        if !is_admin {
            return Err(AppError::Forbidden);
        }

        let patch = normalize_patch(patch);
        EventMetadataRepository::merge(&self.pool, event_id, &patch).await
    }

    /// Flag an event as cancelled and notify everyone who was going. The
    /// metadata row is flagged, never deleted; attendance state is cleared.
    pub async fn cancel_event(
        &self,
        event_id: &str,
        event_title: &str,
        is_admin: bool,
    ) -> AppResult<usize> {
        if !is_admin {
            return Err(AppError::Forbidden);
        }

        let patch = MetadataPatch {
            cancelled: Patch::Set(true),
            cancelled_at: Patch::Set(Utc::now().naive_utc()),
            ..Default::default()
        };
        EventMetadataRepository::merge(&self.pool, event_id, &patch).await?;

        AttendanceService::new(self.pool.clone())
            .notify_cancelled(event_id, event_title)
            .await
    }

    fn dispatch_email(&self, email: AdminEmail) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            mailer.deliver(email).await;
        });
    }
}

/// The daily-limit window: [local midnight, next local midnight), expressed in
/// the UTC timeline that `created_at` lives on.
fn local_day_window(now: DateTime<Local>) -> (NaiveDateTime, NaiveDateTime) {
    let start_local = now.date_naive().and_time(NaiveTime::MIN);
    let end_local = start_local + chrono::Duration::days(1);

    let to_utc = |naive: NaiveDateTime| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.naive_utc())
            .unwrap_or(naive)
    };

    (to_utc(start_local), to_utc(end_local))
}

/// Normalization applied on every metadata write path (edit approval and
/// direct apply): empty strings collapse to `Clear`, Instagram handles lose a
/// leading `@`, and `owner_instagram` / `event_owner` are derived from the
/// handle the same way on every path.
pub fn normalize_patch(mut patch: MetadataPatch) -> MetadataPatch {
    patch.chat_url = clean_text(patch.chat_url);
    patch.partiful_link = clean_text(patch.partiful_link);
    patch.flyer_url = clean_text(patch.flyer_url);
    patch.event_owner = clean_text(patch.event_owner);
    patch.insta_handle = clean_text(patch.insta_handle);

    match &patch.insta_handle {
        Patch::Keep => {}
        Patch::Clear => {
            patch.owner_instagram = Patch::Clear;
        }
        Patch::Set(handle) => {
            let handle = handle.trim_start_matches('@').to_string();
            if handle.is_empty() {
                patch.insta_handle = Patch::Clear;
                patch.owner_instagram = Patch::Clear;
            } else {
                patch.owner_instagram =
                    Patch::Set(format!("https://instagram.com/{}", handle));
                if !matches!(&patch.event_owner, Patch::Set(owner) if !owner.is_empty()) {
                    patch.event_owner = Patch::Set(handle.clone());
                }
                patch.insta_handle = Patch::Set(handle);
            }
        }
    }

    patch
}

fn clean_text(patch: Patch<String>) -> Patch<String> {
    match patch {
        Patch::Set(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Patch::Clear
            } else {
                Patch::Set(trimmed.to_string())
            }
        }
        other => other,
    }
}
