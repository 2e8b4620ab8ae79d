/// Invitation endpoints
///
/// - `POST /api/invitations` - Invite someone without an account by email
/// - `GET /api/invitations` - The caller's pending invitations
/// - `GET /api/invitations/:token` - Public lookup for the sign-up page

use crate::{app::AppState, error::ApiResult, extract::ValidJson};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tasqar_shared::{
    auth::middleware::AuthContext,
    models::invitation::Invitation,
    services::invitation_service::{self, InvitationPreview, SentInvitation},
};
use validator::Validate;

/// Invitation request
#[derive(Debug, Deserialize, Validate)]
pub struct InvitationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Send an invitation email
///
/// The response has `email_sent: false` when delivery failed; the invitation
/// is stored either way.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email
/// - `409 Conflict`: The email already has an account
pub async fn create_invitation(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidJson(req): ValidJson<InvitationRequest>,
) -> ApiResult<(StatusCode, Json<SentInvitation>)> {
    let sent = invitation_service::create(
        &state.db,
        state.mailer.as_ref(),
        &state.invitations,
        auth.user_id,
        req.email.trim(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(sent)))
}

pub async fn list_invitations(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Invitation>>> {
    let invitations = invitation_service::list_pending(&state.db, auth.user_id).await?;
    Ok(Json(invitations))
}

/// Look up an invitation by its link token (no authentication)
///
/// Unknown, expired and already used tokens all answer 404.
pub async fn preview_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<InvitationPreview>> {
    let preview = invitation_service::preview(&state.db, &token).await?;
    Ok(Json(preview))
}
