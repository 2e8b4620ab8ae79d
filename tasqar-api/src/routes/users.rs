/// Profile and user search endpoints
///
/// - `GET /api/users/me` - Current user
/// - `PATCH /api/users/me` - Update name, avatar or password
/// - `GET /api/users/search?q=` - Find people to connect with

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ValidJson,
};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tasqar_shared::{
    auth::middleware::AuthContext,
    models::{
        double_option,
        user::{PublicUser, User},
    },
    services::user_service::{self, ProfileUpdate},
};
use validator::{Validate, ValidateUrl};

const MAX_NAME_LENGTH: usize = 100;

/// Profile update request
///
/// `name` and `avatar_url` accept `null` to clear them.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: Option<String>,

    pub current_password: Option<String>,
}

impl UpdateMeRequest {
    /// Rules on the nullable fields, which `validator` can't express
    fn check_nullable_fields(&self) -> Result<(), ApiError> {
        let mut details = Vec::new();

        if let Some(Some(name)) = &self.name {
            if name.trim().is_empty() || name.chars().count() > MAX_NAME_LENGTH {
                details.push(ValidationErrorDetail::new(
                    "name",
                    "Name must be between 1 and 100 characters",
                ));
            }
        }
        if let Some(Some(url)) = &self.avatar_url {
            if !url.validate_url() {
                details.push(ValidationErrorDetail::new("avatar_url", "Invalid avatar URL"));
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(details))
        }
    }
}

/// User search query
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn get_me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<User>> {
    let user = user_service::get(&state.db, auth.user_id).await?;
    Ok(Json(user))
}

/// Update the current user's profile
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or a password change without the
///   correct `current_password`
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidJson(req): ValidJson<UpdateMeRequest>,
) -> ApiResult<Json<User>> {
    req.check_nullable_fields()?;

    let user = user_service::update_profile(
        &state.db,
        auth.user_id,
        ProfileUpdate {
            name: req.name.map(|name| name.map(|n| n.trim().to_string())),
            avatar_url: req.avatar_url,
            password: req.password,
            current_password: req.current_password,
        },
    )
    .await?;

    Ok(Json(user))
}

/// Search other users by email or name (max 20, never the caller)
pub async fn search_users(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = user_service::search(&state.db, auth.user_id, &query.q).await?;
    Ok(Json(users))
}
