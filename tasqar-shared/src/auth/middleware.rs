/// Authentication middleware for Axum
///
/// Validates the access token and adds an [`AuthContext`] to the request
/// extensions. The token is read from `Authorization: Bearer <token>`, or
/// from the `token` query parameter when the header is absent (browser
/// `EventSource` cannot set headers).
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use tasqar_shared::auth::middleware::{jwt_auth_middleware, AuthContext, JwtSecret};
///
/// async fn me(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.email)
/// }
///
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn_with_state(
///         JwtSecret::new("a-secret-of-at-least-thirty-two-bytes!"),
///         jwt_auth_middleware,
///     ));
/// ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Shared JWT signing secret, cheap to clone into middleware state
#[derive(Clone)]
pub struct JwtSecret(Arc<str>);

impl JwtSecret {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtSecret(..)")
    }
}

/// The authenticated caller, available to handlers after the middleware ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

/// Error type for authentication middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer header and no `token` query parameter
    MissingCredentials,

    /// Authorization header is not `Bearer <token>`
    InvalidFormat(String),

    /// Token failed validation
    InvalidToken(String),
}

impl AuthError {
    fn message(&self) -> &str {
        match self {
            AuthError::MissingCredentials => "Missing credentials",
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "unauthorized",
            "message": self.message(),
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pulls the raw access token out of a request
fn extract_token(req: &Request) -> Result<String, AuthError> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("Invalid authorization header".to_string()))?;

        return value
            .strip_prefix("Bearer ")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()));
    }

    Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredentials)
}

/// JWT authentication middleware
///
/// Use with `axum::middleware::from_fn_with_state(JwtSecret, jwt_auth_middleware)`.
/// Rejects with 401 when the token is missing, malformed, expired, or a
/// refresh token.
pub async fn jwt_auth_middleware(
    State(secret): State<JwtSecret>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_token(&req)?;

    let claims = validate_access_token(&token, secret.as_str()).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, authorization: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_token_from_header() {
        let req = request("/api/tasks", Some("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_token_from_query() {
        let req = request("/api/notifications/sse?token=abc.def.ghi", None);
        assert_eq!(extract_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_header_takes_precedence_over_query() {
        let req = request("/api/notifications/sse?token=from-query", Some("Bearer from-header"));
        assert_eq!(extract_token(&req).unwrap(), "from-header");
    }

    #[test]
    fn test_extract_token_errors() {
        assert_eq!(
            extract_token(&request("/api/tasks", None)),
            Err(AuthError::MissingCredentials)
        );
        assert!(matches!(
            extract_token(&request("/api/tasks", Some("Basic dXNlcjpwYXNz"))),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            extract_token(&request("/api/tasks", Some("Bearer "))),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_auth_error_is_unauthorized() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidFormat("x".to_string()),
            AuthError::InvalidToken("x".to_string()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = JwtSecret::new("super-secret-value");
        assert!(!format!("{:?}", secret).contains("super-secret-value"));
    }
}
