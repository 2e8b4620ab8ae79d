/// Authentication endpoints
///
/// - `POST /api/auth/register` - Register a new user (optionally via invitation)
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tasqar_shared::{
    auth::password,
    services::user_service::{self, AuthSession, Registration},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also checked for strength)
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    /// Token from an invitation link
    pub invitation_token: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecurePass123",
///   "name": "Ada",
///   "invitation_token": "optional token from the invite link"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or the invitation is unusable
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    let invitation_token = req
        .invitation_token
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    let session = user_service::register(
        &state.db,
        Registration {
            email: req.email.trim().to_string(),
            password: req.password,
            name: req
                .name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            invitation_token,
        },
        state.jwt_secret(),
    )
    .await?;

    tracing::info!(user_id = %session.user.id, "User registered");

    Ok((StatusCode::CREATED, Json(session)))
}

/// Login and get a fresh token pair
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<AuthSession>> {
    let session = user_service::login(
        &state.db,
        req.email.trim(),
        &req.password,
        state.jwt_secret(),
    )
    .await?;

    Ok(Json(session))
}

/// Exchange a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, or non-refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = user_service::refresh(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            name: None,
            invitation_token: None,
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_register_request_accepts_valid_input() {
        let req = RegisterRequest {
            email: "ada@example.com".to_string(),
            password: "analytical1".to_string(),
            name: Some("Ada".to_string()),
            invitation_token: None,
        };

        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_login_requires_password() {
        let req = LoginRequest {
            email: "ada@example.com".to_string(),
            password: String::new(),
        };

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }
}
