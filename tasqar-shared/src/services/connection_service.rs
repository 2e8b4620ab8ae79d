//! Connection requests between users
//!
//! A request creates a PENDING connection and notifies the receiver; the
//! receiver accepts it (notifying the sender) or either party deletes it.
//! There is at most one connection per pair of users, whichever way round.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{conflict_on_unique, notification_service, ServiceError, ServiceResult};
use crate::models::{
    connection::{ConnectionList, ConnectionStatus, UserConnection},
    notification::NotificationType,
    user::User,
};

/// Who a connection request is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Email(String),
    UserId(Uuid),
}

pub async fn list(pool: &PgPool, user_id: Uuid) -> ServiceResult<ConnectionList> {
    Ok(UserConnection::list_for_user(pool, user_id).await?)
}

/// Sends a connection request from `sender_id`
pub async fn request(
    pool: &PgPool,
    sender_id: Uuid,
    target: ConnectionTarget,
) -> ServiceResult<UserConnection> {
    let receiver = match target {
        ConnectionTarget::Email(email) => User::find_by_email(pool, &email).await?,
        ConnectionTarget::UserId(id) => User::find_by_id(pool, id).await?,
    }
    .ok_or(ServiceError::NotFound("User"))?;

    if receiver.id == sender_id {
        return Err(ServiceError::BadRequest(
            "You cannot connect with yourself".to_string(),
        ));
    }

    if UserConnection::find_between(pool, sender_id, receiver.id)
        .await?
        .is_some()
    {
        return Err(ServiceError::Conflict(
            "A connection with this user already exists".to_string(),
        ));
    }

    let sender = User::find_by_id(pool, sender_id)
        .await?
        .ok_or(ServiceError::NotFound("User"))?;

    let mut tx = pool.begin().await?;

    // The pair index catches a request racing the check above.
    let connection =
        UserConnection::create(&mut *tx, sender_id, receiver.id, ConnectionStatus::Pending)
            .await
            .map_err(|e| conflict_on_unique(e, "A connection with this user already exists"))?;

    notification_service::notify(
        &mut *tx,
        receiver.id,
        NotificationType::ConnectionRequest,
        notification_service::messages::connection_request(sender.display_name()),
        Some(connection.id),
    )
    .await?;

    tx.commit().await?;

    info!(connection_id = %connection.id, sender_id = %sender_id, receiver_id = %receiver.id, "Connection requested");
    Ok(connection)
}

/// Accepts a pending request addressed to `user_id`
pub async fn accept(pool: &PgPool, user_id: Uuid, connection_id: Uuid) -> ServiceResult<UserConnection> {
    let existing = UserConnection::find_by_id(pool, connection_id)
        .await?
        .filter(|c| c.involves(user_id))
        .ok_or(ServiceError::NotFound("Connection"))?;

    if existing.receiver_id != user_id {
        return Err(ServiceError::Forbidden(
            "Only the receiver can accept a connection request".to_string(),
        ));
    }
    if existing.status == ConnectionStatus::Accepted {
        return Err(ServiceError::Conflict(
            "Connection is already accepted".to_string(),
        ));
    }

    let receiver = User::find_by_id(pool, user_id)
        .await?
        .ok_or(ServiceError::NotFound("User"))?;

    let mut tx = pool.begin().await?;

    let connection = UserConnection::accept(&mut *tx, connection_id, user_id)
        .await?
        .ok_or(ServiceError::NotFound("Connection"))?;

    notification_service::notify(
        &mut *tx,
        connection.sender_id,
        NotificationType::ConnectionAccepted,
        notification_service::messages::connection_accepted(receiver.display_name()),
        Some(connection.id),
    )
    .await?;

    tx.commit().await?;

    info!(connection_id = %connection.id, user_id = %user_id, "Connection accepted");
    Ok(connection)
}

/// Rejects a pending request or removes an accepted connection
pub async fn remove(pool: &PgPool, user_id: Uuid, connection_id: Uuid) -> ServiceResult<()> {
    if !UserConnection::delete_for_user(pool, connection_id, user_id).await? {
        return Err(ServiceError::NotFound("Connection"));
    }

    info!(connection_id = %connection_id, user_id = %user_id, "Connection removed");
    Ok(())
}

/// Whether `user_id` may assign tasks to `assignee_id`
pub async fn can_assign(pool: &PgPool, user_id: Uuid, assignee_id: Uuid) -> ServiceResult<bool> {
    if user_id == assignee_id {
        return Ok(true);
    }

    Ok(UserConnection::are_connected(pool, user_id, assignee_id).await?)
}
