/// Client error types

use serde::Deserialize;
use uuid::Uuid;

/// Field-level validation message returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Error body the API sends with every non-2xx response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub details: Vec<FieldError>,
}

/// Client error types
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure (connection refused, timeout, TLS)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        details: Vec<FieldError>,
    },

    /// A response body didn't match the expected shape
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No access token; call `login` or `register` first
    #[error("Not signed in")]
    NotAuthenticated,

    /// Board operation on a task that isn't on the board
    #[error("Task {0} is not on the board")]
    UnknownTask(Uuid),

    /// The notification stream reported an error or closed unexpectedly
    #[error("Notification stream error: {0}")]
    Stream(String),
}

impl ClientError {
    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::NotAuthenticated) || self.status() == Some(401)
    }

    /// Message for a field, when the API rejected that field
    pub fn field_message(&self, field: &str) -> Option<&str> {
        match self {
            ClientError::Api { details, .. } => details
                .iter()
                .find(|d| d.field == field)
                .map(|d| d.message.as_str()),
            _ => None,
        }
    }

    /// Builds an API error from a status and raw body
    ///
    /// Bodies that aren't the API's JSON error shape keep the raw text as the
    /// message.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(body) => ClientError::Api {
                status,
                code: body.error,
                message: body.message,
                details: body.details,
            },
            Err(_) => ClientError::Api {
                status,
                code: "unknown".to_string(),
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.to_string()
                },
                details: Vec::new(),
            },
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_parses_validation_details() {
        let err = ClientError::from_response(
            400,
            r#"{"error":"validation_error","message":"Request validation failed","details":[{"field":"title","message":"Title is required"}]}"#,
        );

        assert_eq!(err.status(), Some(400));
        assert_eq!(err.field_message("title"), Some("Title is required"));
        assert_eq!(err.to_string(), "Request validation failed");
    }

    #[test]
    fn test_from_response_keeps_raw_text() {
        let err = ClientError::from_response(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Bad Gateway");

        let err = ClientError::from_response(500, "");
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(ClientError::NotAuthenticated.is_unauthorized());
        assert!(ClientError::from_response(401, "{}").is_unauthorized());
        assert!(!ClientError::UnknownTask(Uuid::nil()).is_unauthorized());
    }
}
