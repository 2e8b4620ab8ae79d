//! In-app notifications
//!
//! Notifications are written alongside the event they describe and read back
//! by the list endpoints and the notification stream. A user can only see and
//! change their own notifications; other users' IDs behave as missing.

use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::models::notification::{CreateNotification, Notification, NotificationType};

/// Writes a notification for `user_id`
pub async fn notify<'e, E>(
    executor: E,
    user_id: Uuid,
    kind: NotificationType,
    message: String,
    related_id: Option<Uuid>,
) -> ServiceResult<Notification>
where
    E: PgExecutor<'e>,
{
    let notification = Notification::create(
        executor,
        CreateNotification {
            user_id,
            kind,
            message,
            related_id,
        },
    )
    .await?;

    debug!(user_id = %user_id, kind = ?kind, notification_id = %notification.id, "Notification created");
    Ok(notification)
}

/// Lists the user's notifications, newest first
pub async fn list(pool: &PgPool, user_id: Uuid, unread_only: bool) -> ServiceResult<Vec<Notification>> {
    Ok(Notification::list_for_user(pool, user_id, unread_only).await?)
}

pub async fn mark_read(pool: &PgPool, user_id: Uuid, id: Uuid) -> ServiceResult<Notification> {
    Notification::mark_read(pool, id, user_id)
        .await?
        .ok_or(ServiceError::NotFound("Notification"))
}

/// Marks everything read, returning how many notifications changed
pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> ServiceResult<u64> {
    Ok(Notification::mark_all_read(pool, user_id).await?)
}

pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> ServiceResult<()> {
    if Notification::delete_for_user(pool, id, user_id).await? {
        Ok(())
    } else {
        Err(ServiceError::NotFound("Notification"))
    }
}

/// Message texts, kept together so wording stays consistent
pub mod messages {
    pub fn connection_request(sender: &str) -> String {
        format!("{sender} wants to connect with you")
    }

    pub fn connection_accepted(receiver: &str) -> String {
        format!("{receiver} accepted your connection request")
    }

    pub fn task_assigned(assigner: &str, task_title: &str) -> String {
        format!("{assigner} assigned you the task \"{task_title}\"")
    }

    pub fn invitation_accepted(invitee: &str) -> String {
        format!("{invitee} accepted your invitation and joined Tasqar")
    }
}

#[cfg(test)]
mod tests {
    use super::messages;

    #[test]
    fn test_messages() {
        assert_eq!(
            messages::connection_request("Jane"),
            "Jane wants to connect with you"
        );
        assert_eq!(
            messages::task_assigned("Jane", "Ship it"),
            "Jane assigned you the task \"Ship it\""
        );
        assert!(messages::invitation_accepted("sam@example.com").starts_with("sam@example.com"));
        assert!(messages::connection_accepted("Sam").contains("accepted"));
    }
}
