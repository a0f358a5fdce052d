use std::collections::HashMap;

use futures::future::join_all;
use sqlx::SqlitePool;

use crate::db::models::GoingRecord;
use crate::db::GoingRepository;
use crate::error::AppResult;
use crate::services::notifications::{NotificationKind, NotificationService};

/// Per-user "going" toggle, aggregate counts, and the cancellation fan-out.
pub struct AttendanceService {
    pool: SqlitePool,
    notifications: NotificationService,
}

impl AttendanceService {
    pub fn new(pool: SqlitePool) -> Self {
        let notifications = NotificationService::new(pool.clone());
        Self {
            pool,
            notifications,
        }
    }

    /// Flip the user's going state and return the new state.
    ///
    /// The insert is conditional (create-if-absent), so two rapid toggles for
    /// the same key resolve to create-then-delete; they can never both report
    /// "going".
    pub async fn toggle(
        &self,
        event_id: &str,
        user_id: &str,
        user_name: &str,
    ) -> AppResult<bool> {
        if GoingRepository::insert_if_absent(&self.pool, event_id, user_id, user_name).await? {
            return Ok(true);
        }
        GoingRepository::delete(&self.pool, event_id, user_id).await?;
        Ok(false)
    }

    /// Going counts per event id. Each id is resolved independently; there is
    /// no cross-event consistency guarantee, these are independent counters.
    pub async fn counts_for(&self, event_ids: &[String]) -> AppResult<HashMap<String, i64>> {
        let mut counts = HashMap::with_capacity(event_ids.len());
        for event_id in event_ids {
            let count = GoingRepository::count_for_event(&self.pool, event_id).await?;
            counts.insert(event_id.clone(), count);
        }
        Ok(counts)
    }

    /// Whether the given user is going, per event id.
    pub async fn status_for(
        &self,
        event_ids: &[String],
        user_id: &str,
    ) -> AppResult<HashMap<String, bool>> {
        let mut status = HashMap::with_capacity(event_ids.len());
        for event_id in event_ids {
            let going = GoingRepository::exists(&self.pool, event_id, user_id).await?;
            status.insert(event_id.clone(), going);
        }
        Ok(status)
    }

    pub async fn attendees(&self, event_id: &str) -> AppResult<Vec<GoingRecord>> {
        GoingRepository::find_for_event(&self.pool, event_id).await
    }

    /// Cancellation fan-out: one notification per attendee, then the event's
    /// attendance state is cleared entirely (deleted, not flagged). Returns
    /// the number of attendees processed; zero is a normal outcome.
    pub async fn notify_cancelled(&self, event_id: &str, event_title: &str) -> AppResult<usize> {
        let going = GoingRepository::find_for_event(&self.pool, event_id).await?;
        if going.is_empty() {
            return Ok(0);
        }

        let message = format!(
            "The event \"{}\" has been cancelled or removed.",
            event_title
        );
        join_all(going.iter().map(|record| {
            self.notifications.notify(
                &record.user_id,
                NotificationKind::EventCancelled,
                "Event Cancelled",
                &message,
                Some(event_id),
            )
        }))
        .await;

        GoingRepository::delete_for_event(&self.pool, event_id).await?;

        Ok(going.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn toggle_flips_between_going_and_not_going() {
        let pool = memory_pool().await;
        let service = AttendanceService::new(pool);

        assert!(service.toggle("uid-1", "user-1", "Alex").await.unwrap());
        assert!(!service.toggle("uid-1", "user-1", "Alex").await.unwrap());

        let counts = service.counts_for(&["uid-1".to_string()]).await.unwrap();
        assert_eq!(counts["uid-1"], 0);

        // Toggling back on works after a full cycle
        assert!(service.toggle("uid-1", "user-1", "Alex").await.unwrap());
        let counts = service.counts_for(&["uid-1".to_string()]).await.unwrap();
        assert_eq!(counts["uid-1"], 1);
    }

    #[tokio::test]
    async fn counts_and_status_resolve_per_event() {
        let pool = memory_pool().await;
        let service = AttendanceService::new(pool);

        service.toggle("uid-1", "user-1", "Alex").await.unwrap();
        service.toggle("uid-1", "user-2", "Blair").await.unwrap();
        service.toggle("uid-2", "user-1", "Alex").await.unwrap();

        let ids = vec!["uid-1".to_string(), "uid-2".to_string(), "uid-3".to_string()];
        let counts = service.counts_for(&ids).await.unwrap();
        assert_eq!(counts["uid-1"], 2);
        assert_eq!(counts["uid-2"], 1);
        assert_eq!(counts["uid-3"], 0);

        let status = service.status_for(&ids, "user-2").await.unwrap();
        assert!(status["uid-1"]);
        assert!(!status["uid-2"]);
        assert!(!status["uid-3"]);
    }

    #[tokio::test]
    async fn cancellation_notifies_each_attendee_and_clears_state() {
        let pool = memory_pool().await;
        let service = AttendanceService::new(pool.clone());
        let notifications = NotificationService::new(pool);

        for (user, name) in [("user-1", "Alex"), ("user-2", "Blair"), ("user-3", "Cass")] {
            service.toggle("uid-1", user, name).await.unwrap();
        }
        // An attendee of a different event must not be notified
        service.toggle("uid-2", "user-4", "Drew").await.unwrap();

        let notified = service.notify_cancelled("uid-1", "Beach Day").await.unwrap();
        assert_eq!(notified, 3);

        for user in ["user-1", "user-2", "user-3"] {
            let listed = notifications.list_for_user(user).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].kind, "event_cancelled");
            assert_eq!(listed[0].related_id.as_deref(), Some("uid-1"));
        }
        assert!(notifications.list_for_user("user-4").await.unwrap().is_empty());

        let counts = service
            .counts_for(&["uid-1".to_string(), "uid-2".to_string()])
            .await
            .unwrap();
        assert_eq!(counts["uid-1"], 0);
        assert_eq!(counts["uid-2"], 1);
    }

    #[tokio::test]
    async fn cancelling_with_no_attendees_is_a_normal_zero() {
        let pool = memory_pool().await;
        let service = AttendanceService::new(pool);

        let notified = service.notify_cancelled("uid-9", "Ghost Event").await.unwrap();
        assert_eq!(notified, 0);
    }
}
