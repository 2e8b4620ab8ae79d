/// Connection endpoints
///
/// - `GET /api/connections` - Accepted, incoming and outgoing connections
/// - `POST /api/connections` - Send a request by `email` or `user_id`
/// - `POST /api/connections/:id/accept` - Accept an incoming request
/// - `DELETE /api/connections/:id` - Reject a request or remove a connection

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tasqar_shared::{
    auth::middleware::AuthContext,
    models::connection::{ConnectionList, UserConnection},
    services::connection_service::{self, ConnectionTarget},
};
use uuid::Uuid;
use validator::Validate;

/// Connection request; exactly one of `email` and `user_id`
#[derive(Debug, Deserialize, Validate)]
pub struct ConnectionRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub user_id: Option<Uuid>,
}

impl ConnectionRequest {
    fn target(self) -> Result<ConnectionTarget, ApiError> {
        match (self.email, self.user_id) {
            (Some(email), None) => Ok(ConnectionTarget::Email(email.trim().to_string())),
            (None, Some(user_id)) => Ok(ConnectionTarget::UserId(user_id)),
            _ => Err(ApiError::BadRequest(
                "Provide either email or user_id".to_string(),
            )),
        }
    }
}

pub async fn list_connections(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ConnectionList>> {
    let connections = connection_service::list(&state.db, auth.user_id).await?;
    Ok(Json(connections))
}

/// Send a connection request; the receiver is notified
///
/// # Errors
///
/// - `400 Bad Request`: Request to yourself
/// - `404 Not Found`: No such user
/// - `409 Conflict`: The two users already have a connection or request
pub async fn request_connection(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidJson(req): ValidJson<ConnectionRequest>,
) -> ApiResult<(StatusCode, Json<UserConnection>)> {
    let connection = connection_service::request(&state.db, auth.user_id, req.target()?).await?;
    Ok((StatusCode::CREATED, Json(connection)))
}

/// Accept a pending request; only its receiver may
pub async fn accept_connection(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserConnection>> {
    let connection = connection_service::accept(&state.db, auth.user_id, id).await?;
    Ok(Json(connection))
}

pub async fn remove_connection(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    connection_service::remove(&state.db, auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
