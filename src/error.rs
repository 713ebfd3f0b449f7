// Error types for tourdesk.
// Separates HTTP error responses (fail fast) from transport failures (retried).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Typed application error raised for a non-2xx HTTP response.
#[derive(Error, Debug, Clone)]
#[error("{message} (HTTP {status}, {code})")]
pub struct ApiError {
    /// Server-provided error code, or a fallback derived from the status.
    pub code: String,
    /// Server-provided message, or the HTTP status text.
    pub message: String,
    /// HTTP status code of the response.
    pub status: u16,
    /// Raw error body as returned by the server (`Null` when empty or not JSON).
    pub payload: Value,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Missing required fields for {collection}: {}", fields.join(", "))]
    Validation {
        collection: &'static str,
        fields: Vec<&'static str>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Connection-level failures that are worth another attempt.
    ///
    /// HTTP error responses are never transient: a failed write must not be
    /// replayed against the backend.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.status),
            Error::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error shared between state, callbacks and callers.
pub type SharedError = Arc<Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_are_not_transient() {
        let err = Error::Api(ApiError {
            code: "INTERNAL".to_string(),
            message: "boom".to_string(),
            status: 500,
            payload: Value::Null,
        });
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_timeout_is_transient() {
        assert!(Error::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!Error::Cancelled.is_transient());
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = Error::Validation {
            collection: "bookings",
            fields: vec!["name", "email"],
        };
        assert_eq!(
            err.to_string(),
            "Missing required fields for bookings: name, email"
        );
    }
}
