//! Client error types

use serde_json::Value as JsonValue;
use shopfront_core::CoreError;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflicting resource state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The access token could not be refreshed; the session has been cleared
    #[error("Session expired: {0}")]
    Refresh(#[from] RefreshError),

    /// Persisting the session failed
    #[error("Session storage error: {0}")]
    Storage(#[from] CoreError),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 | 422 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the user has to sign in again
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_) | Self::Refresh(_))
    }

    /// HTTP status behind this error, when there was a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::ServerError { status, .. } => Some(*status),
            Self::AuthenticationFailed(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            Self::Conflict(_) => Some(409),
            Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Why a token refresh failed
///
/// Cloneable so one outcome can be handed to every request waiting on the
/// same refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The refresh endpoint answered with an error status
    #[error("refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh endpoint succeeded but returned no access token
    #[error("refresh response did not contain an access token")]
    MissingToken,

    /// The refresh request never got a response
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// The refresh coordinator task has stopped
    #[error("refresh coordinator is not running")]
    Closed,
}

/// Best-effort human readable message from an error response body
///
/// Looks for a `message` (string or list of strings) or `error` field in a
/// JSON body, then falls back to the raw text, then to the status reason.
pub fn extract_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(json) = serde_json::from_str::<JsonValue>(body) {
        let field = json.get("message").or_else(|| json.get("error"));
        match field {
            Some(JsonValue::String(message)) if !message.is_empty() => return message.clone(),
            Some(JsonValue::Array(messages)) => {
                let joined = messages
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .collect::<Vec<_>>()
                    .join("; ");
                if !joined.is_empty() {
                    return joined;
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, "x".into()),
            ClientError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "x".into()),
            ClientError::BadRequest(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::CONFLICT, "x".into()),
            ClientError::Conflict(_)
        ));
        let err = ClientError::from_status(StatusCode::BAD_GATEWAY, "x".into());
        assert_eq!(err.status(), Some(502));
        assert!(!err.is_auth_expired());
    }

    #[test]
    fn test_extract_message_prefers_json_fields() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            extract_message(r#"{"message":"Price must be positive"}"#, status),
            "Price must be positive"
        );
        assert_eq!(
            extract_message(r#"{"message":["name is required","price is required"]}"#, status),
            "name is required; price is required"
        );
        assert_eq!(extract_message(r#"{"error":"Bad Request"}"#, status), "Bad Request");
        assert_eq!(extract_message("plain failure\n", status), "plain failure");
        assert_eq!(extract_message("", status), status.to_string());
    }

    #[test]
    fn test_refresh_errors_count_as_expired_sessions() {
        let err = ClientError::from(RefreshError::MissingToken);
        assert!(err.is_auth_expired());
        assert_eq!(err.status(), None);
    }
}
