/// Request extractors shared by the route handlers

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has passed `validator` checks
///
/// Malformed JSON becomes `400 bad_request`; failed field rules become
/// `400 validation_error` with per-field details.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct NewThing {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let ValidJson(thing) = ValidJson::<NewThing>::from_request(json_request(r#"{"title":"x"}"#), &())
            .await
            .unwrap();
        assert_eq!(thing.title, "x");
    }

    #[tokio::test]
    async fn test_rule_violation_is_validation_error() {
        let err = ValidJson::<NewThing>::from_request(json_request(r#"{"title":""}"#), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(ref d) if d[0].field == "title"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let err = ValidJson::<NewThing>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let err = ValidJson::<NewThing>::from_request(json_request("{}"), &())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
