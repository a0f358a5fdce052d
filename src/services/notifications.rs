use sqlx::SqlitePool;

use crate::db::models::{AdminNotification, Notification};
use crate::db::{AdminNotificationRepository, UserNotificationRepository};
use crate::error::{AppError, AppResult};

/// Notification feeds are capped at the most recent entries; older ones stay
/// in the store as an audit trail but are not listed.
pub const NOTIFICATION_LIST_LIMIT: i64 = 50;

/// The enumerated notification kinds. The wire strings are part of the
/// contract: downstream navigation branches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    EventRequest,
    EventEdit,
    RequestApproved,
    RequestRejected,
    EditApproved,
    EditRejected,
    EventCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::EventRequest => "event_request",
            NotificationKind::EventEdit => "event_edit",
            NotificationKind::RequestApproved => "request_approved",
            NotificationKind::RequestRejected => "request_rejected",
            NotificationKind::EditApproved => "edit_approved",
            NotificationKind::EditRejected => "edit_rejected",
            NotificationKind::EventCancelled => "event_cancelled",
        }
    }
}

/// Creates, lists, and marks-read notifications for end users and admins.
///
/// Creation is fire-and-forget: a failed insert is logged and swallowed so it
/// can never fail or roll back the workflow transition that triggered it.
#[derive(Clone)]
pub struct NotificationService {
    pool: SqlitePool,
}

impl NotificationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<&str>,
    ) {
        if let Err(e) = UserNotificationRepository::create(
            &self.pool,
            user_id,
            kind.as_str(),
            title,
            message,
            related_id,
        )
        .await
        {
            tracing::warn!("Failed to create notification for user {}: {:?}", user_id, e);
        }
    }

    pub async fn notify_admin(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<&str>,
        from_email: Option<&str>,
    ) {
        if let Err(e) = AdminNotificationRepository::create(
            &self.pool,
            kind.as_str(),
            title,
            message,
            related_id,
            from_email,
        )
        .await
        {
            tracing::warn!("Failed to create admin notification: {:?}", e);
        }
    }

    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        UserNotificationRepository::list_recent(&self.pool, user_id, NOTIFICATION_LIST_LIMIT).await
    }

    pub async fn list_admin(&self) -> AppResult<Vec<AdminNotification>> {
        AdminNotificationRepository::list_recent(&self.pool, NOTIFICATION_LIST_LIMIT).await
    }

    pub async fn mark_read(&self, id: &str, user_id: &str) -> AppResult<()> {
        if !UserNotificationRepository::mark_read(&self.pool, id, user_id).await? {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }
        Ok(())
    }

    pub async fn mark_admin_read(&self, id: &str) -> AppResult<()> {
        if !AdminNotificationRepository::mark_read(&self.pool, id).await? {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }
        Ok(())
    }

    pub async fn unread_count(&self, user_id: &str) -> AppResult<i64> {
        UserNotificationRepository::unread_count(&self.pool, user_id).await
    }

    pub async fn admin_unread_count(&self) -> AppResult<i64> {
        AdminNotificationRepository::unread_count(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn notify_and_unread_count() {
        let pool = memory_pool().await;
        let service = NotificationService::new(pool);

        service
            .notify(
                "user-1",
                NotificationKind::RequestApproved,
                "Event Request Approved",
                "Your event request \"Picnic\" has been approved!",
                Some("req-1"),
            )
            .await;
        service
            .notify(
                "user-1",
                NotificationKind::RequestRejected,
                "Event Request Rejected",
                "Your event request \"Rave\" was rejected.",
                Some("req-2"),
            )
            .await;

        assert_eq!(service.unread_count("user-1").await.unwrap(), 2);
        assert_eq!(service.unread_count("user-2").await.unwrap(), 0);

        let listed = service.list_for_user("user-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].kind, "request_rejected");
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_scoped_to_owner() {
        let pool = memory_pool().await;
        let service = NotificationService::new(pool);

        service
            .notify(
                "user-1",
                NotificationKind::EventCancelled,
                "Event Cancelled",
                "The event \"Picnic\" has been cancelled or removed.",
                Some("uid-1"),
            )
            .await;

        let id = service.list_for_user("user-1").await.unwrap()[0].id.clone();

        service.mark_read(&id, "user-1").await.unwrap();
        let first_read_at = service.list_for_user("user-1").await.unwrap()[0].read_at;
        assert!(first_read_at.is_some());

        // Second mark keeps the original read_at
        service.mark_read(&id, "user-1").await.unwrap();
        let second_read_at = service.list_for_user("user-1").await.unwrap()[0].read_at;
        assert_eq!(first_read_at, second_read_at);
        assert_eq!(service.unread_count("user-1").await.unwrap(), 0);

        // Another user cannot mark someone else's notification
        assert!(matches!(
            service.mark_read(&id, "user-2").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_capped() {
        let pool = memory_pool().await;
        let service = NotificationService::new(pool);

        for i in 0..55 {
            service
                .notify_admin(
                    NotificationKind::EventRequest,
                    "New Event Request",
                    &format!("submission #{}", i),
                    None,
                    Some("someone@example.com"),
                )
                .await;
        }

        let listed = service.list_admin().await.unwrap();
        assert_eq!(listed.len(), NOTIFICATION_LIST_LIMIT as usize);
        assert_eq!(service.admin_unread_count().await.unwrap(), 55);
    }
}
