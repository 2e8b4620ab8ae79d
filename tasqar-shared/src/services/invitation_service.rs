//! Email invitations for people who don't have an account yet
//!
//! The invitee receives a sign-up link carrying a random token. Registering
//! with that token (see `user_service::register`) connects them with the
//! inviter. Email delivery failures are logged and don't fail the request.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::auth::invitation_token;
use crate::email::{invitation_email, Mailer};
use crate::models::{
    invitation::{CreateInvitation, Invitation},
    user::User,
};

/// Settings that shape invitation links and lifetime
#[derive(Debug, Clone)]
pub struct InvitationSettings {
    /// Base URL of the web app, used to build sign-up links
    pub app_base_url: String,

    /// How long an invitation stays usable
    pub ttl: Duration,
}

/// What the sign-up page shows for an invitation link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationPreview {
    pub email: String,
    pub inviter_name: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of sending an invitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentInvitation {
    #[serde(flatten)]
    pub invitation: Invitation,

    /// False when the email could not be delivered
    pub email_sent: bool,
}

/// Invites `email` on behalf of `inviter_id`
///
/// Fails with 409 when the address already belongs to a user; those should
/// get a connection request instead.
pub async fn create(
    pool: &PgPool,
    mailer: &dyn Mailer,
    settings: &InvitationSettings,
    inviter_id: Uuid,
    email: &str,
) -> ServiceResult<SentInvitation> {
    if User::find_by_email(pool, email).await?.is_some() {
        return Err(ServiceError::Conflict(
            "This email already has an account; send a connection request instead".to_string(),
        ));
    }

    let inviter = User::find_by_id(pool, inviter_id)
        .await?
        .ok_or(ServiceError::NotFound("User"))?;

    let (token, token_hash) = invitation_token::generate_token();
    let invitation = Invitation::create(
        pool,
        CreateInvitation {
            inviter_id,
            email: email.to_string(),
            token_hash,
            expires_at: Utc::now() + settings.ttl,
        },
    )
    .await?;

    info!(invitation_id = %invitation.id, inviter_id = %inviter_id, "Invitation created");

    let link = invitation_token::invitation_link(&settings.app_base_url, &token);
    let message = invitation_email(
        &invitation.email,
        inviter.display_name(),
        &link,
        invitation.expires_at,
    );

    let email_sent = match mailer.send(&message).await {
        Ok(()) => true,
        Err(e) => {
            error!(invitation_id = %invitation.id, error = %e, "Failed to send invitation email");
            false
        }
    };

    Ok(SentInvitation {
        invitation,
        email_sent,
    })
}

/// Invitations sent by the user that can still be accepted
pub async fn list_pending(pool: &PgPool, inviter_id: Uuid) -> ServiceResult<Vec<Invitation>> {
    Ok(Invitation::list_pending(pool, inviter_id).await?)
}

/// Looks up a usable invitation by its plaintext token
///
/// Unknown, expired and already used tokens all give 404.
pub async fn preview(pool: &PgPool, token: &str) -> ServiceResult<InvitationPreview> {
    if !invitation_token::is_valid_format(token) {
        return Err(ServiceError::NotFound("Invitation"));
    }

    let invitation = Invitation::find_by_token_hash(pool, &invitation_token::hash_token(token))
        .await?
        .filter(|invitation| invitation.is_usable(Utc::now()))
        .ok_or(ServiceError::NotFound("Invitation"))?;

    let inviter = User::find_by_id(pool, invitation.inviter_id)
        .await?
        .ok_or(ServiceError::NotFound("Invitation"))?;

    Ok(InvitationPreview {
        email: invitation.email,
        inviter_name: inviter.display_name().to_string(),
        expires_at: invitation.expires_at,
    })
}
