//! Accounts: registration, login, profile and user search

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use sqlx::PgPool;

use super::{conflict_on_unique, notification_service, ServiceError, ServiceResult};
use crate::auth::{
    invitation_token,
    jwt::{issue_token_pair, refresh_access_token, TokenPair},
    password::{hash_password, validate_password_strength, verify_password},
};
use crate::models::{
    connection::{ConnectionStatus, UserConnection},
    invitation::Invitation,
    notification::NotificationType,
    user::{CreateUser, PublicUser, UpdateUser, User},
};

/// Maximum number of users returned by a search
pub const SEARCH_LIMIT: i64 = 20;

/// Sign-up input
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub invitation_token: Option<String>,
}

/// A signed-in user with fresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Profile changes; a password change needs the current password
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub password: Option<String>,
    pub current_password: Option<String>,
}

/// Creates an account and signs it in
///
/// With an invitation token, the invitation is consumed in the same
/// transaction: the new user and the inviter become connected and the
/// inviter is notified.
pub async fn register(
    pool: &PgPool,
    registration: Registration,
    jwt_secret: &str,
) -> ServiceResult<AuthSession> {
    validate_password_strength(&registration.password)
        .map_err(|msg| ServiceError::BadRequest(msg.to_string()))?;

    let password_hash = hash_password(&registration.password)?;
    let mut tx = pool.begin().await?;

    let invitation = match registration.invitation_token.as_deref() {
        Some(token) => Some(find_usable_invitation(&mut tx, token).await?),
        None => None,
    };

    let user = User::create(
        &mut *tx,
        CreateUser {
            email: registration.email,
            password_hash,
            name: registration.name,
        },
    )
    .await
    .map_err(|e| conflict_on_unique(e, "Email is already registered"))?;

    if let Some(invitation) = invitation {
        if !Invitation::mark_accepted(&mut *tx, invitation.id).await? {
            return Err(ServiceError::BadRequest(
                "Invitation has already been used".to_string(),
            ));
        }

        if !invitation.email.eq_ignore_ascii_case(&user.email) {
            warn!(invitation_id = %invitation.id, "Invitation accepted with a different email address");
        }

        UserConnection::create(
            &mut *tx,
            invitation.inviter_id,
            user.id,
            ConnectionStatus::Accepted,
        )
        .await
        .map_err(|e| conflict_on_unique(e, "Users are already connected"))?;

        notification_service::notify(
            &mut *tx,
            invitation.inviter_id,
            NotificationType::InvitationAccepted,
            notification_service::messages::invitation_accepted(user.display_name()),
            Some(invitation.id),
        )
        .await?;

        info!(user_id = %user.id, inviter_id = %invitation.inviter_id, "Invitation accepted");
    }

    tx.commit().await?;

    info!(user_id = %user.id, "User registered");
    let tokens = issue_token_pair(user.id, &user.email, jwt_secret)?;
    Ok(AuthSession { user, tokens })
}

async fn find_usable_invitation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    token: &str,
) -> ServiceResult<Invitation> {
    let invalid = || ServiceError::BadRequest("Invitation is invalid or has expired".to_string());

    if !invitation_token::is_valid_format(token) {
        return Err(invalid());
    }

    let hash = invitation_token::hash_token(token);
    Invitation::find_by_token_hash(&mut **tx, &hash)
        .await?
        .filter(|invitation| invitation.is_usable(chrono::Utc::now()))
        .ok_or_else(invalid)
}

/// Checks credentials and issues tokens
///
/// Unknown email and wrong password produce the same error.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    jwt_secret: &str,
) -> ServiceResult<AuthSession> {
    let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

    let mut user = User::find_by_email(pool, email).await?.ok_or_else(invalid)?;

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    User::update_last_login(pool, user.id).await?;
    user.last_login_at = Some(chrono::Utc::now());

    info!(user_id = %user.id, "User logged in");
    let tokens = issue_token_pair(user.id, &user.email, jwt_secret)?;
    Ok(AuthSession { user, tokens })
}

/// Exchanges a refresh token for a new access token
pub fn refresh(refresh_token: &str, jwt_secret: &str) -> ServiceResult<String> {
    refresh_access_token(refresh_token, jwt_secret)
        .map_err(|_| ServiceError::Unauthorized("Invalid refresh token".to_string()))
}

pub async fn get(pool: &PgPool, user_id: Uuid) -> ServiceResult<User> {
    User::find_by_id(pool, user_id)
        .await?
        .ok_or(ServiceError::NotFound("User"))
}

/// Applies profile changes
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    update: ProfileUpdate,
) -> ServiceResult<User> {
    let mut data = UpdateUser {
        password_hash: None,
        name: update.name,
        avatar_url: update.avatar_url,
    };

    if let Some(password) = update.password {
        let current = update.current_password.ok_or_else(|| {
            ServiceError::BadRequest("Current password is required to set a new password".to_string())
        })?;

        let user = get(pool, user_id).await?;
        if !verify_password(&current, &user.password_hash)? {
            return Err(ServiceError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        validate_password_strength(&password)
            .map_err(|msg| ServiceError::BadRequest(msg.to_string()))?;
        data.password_hash = Some(hash_password(&password)?);

        info!(user_id = %user_id, "Password changed");
    }

    if data.is_empty() {
        return get(pool, user_id).await;
    }

    User::update(pool, user_id, data)
        .await?
        .ok_or(ServiceError::NotFound("User"))
}

/// Finds other users by email or name
pub async fn search(pool: &PgPool, user_id: Uuid, query: &str) -> ServiceResult<Vec<PublicUser>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    Ok(User::search(pool, query, user_id, SEARCH_LIMIT).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenPair;
    use chrono::Utc;

    #[test]
    fn test_auth_session_serializes_tokens_flat() {
        let session = AuthSession {
            user: User {
                id: Uuid::new_v4(),
                email: "jane@example.com".to_string(),
                name: None,
                password_hash: "$argon2id$x".to_string(),
                avatar_url: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                last_login_at: None,
            },
            tokens: TokenPair {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
            },
        };

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["access_token"], "access");
        assert_eq!(json["refresh_token"], "refresh");
        assert_eq!(json["user"]["email"], "jane@example.com");
        assert!(json["user"].get("password_hash").is_none());
    }

    #[test]
    fn test_refresh_rejects_garbage() {
        assert!(matches!(
            refresh("not-a-token", "a-secret-of-at-least-thirty-two-bytes!"),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
