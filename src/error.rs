//! Error types for the Autotask client.
//!
//! This module defines `AutotaskError`, the unified error type returned by
//! the transport, the pagination engine and the entity facade.
//!
//! # Security
//!
//! Error messages built from HTTP responses are sanitized so the API secret
//! never reaches logs or callers. Use `sanitize_message()` when building a
//! message from external text.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::filter::FilterError;

/// The pagination step whose response could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// The initial query request.
    FirstPage,
    /// Following a next-page cursor.
    NextPage,
    /// Following a previous-page cursor.
    PreviousPage,
    /// Walking cursors towards a requested page.
    TargetPage {
        /// The page number being fetched.
        page: u32,
    },
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::FirstPage => f.write_str("first page"),
            FetchStage::NextPage => f.write_str("next page"),
            FetchStage::PreviousPage => f.write_str("previous page"),
            FetchStage::TargetPage { page } => write!(f, "page {}", page),
        }
    }
}

/// Unified error type for all Autotask operations.
#[derive(Error, Debug)]
pub enum AutotaskError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// HTTP response returned a non-success status without an Autotask error body.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The response body, sanitized and truncated.
        body: String,
    },

    /// Autotask returned a structured error response.
    #[error("Autotask API error {status}: {message}")]
    Api {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// First error message reported by the API.
        message: String,
        /// All error messages reported by the API.
        errors: Vec<String>,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} ({operation})")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// Rate limited by the server (HTTP 429).
    #[error("rate limited by server - please wait before retrying")]
    RateLimited {
        /// Suggested retry delay, if provided by server.
        retry_after: Option<Duration>,
    },

    /// JSON serialization or deserialization failed outside pagination.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A page response did not have the expected shape.
    #[error("failed to decode {stage} response: {source}")]
    Decode {
        /// Which fetch produced the response.
        stage: FetchStage,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Requested resource was not found.
    #[error("not found: {resource}")]
    NotFound {
        /// The path or entity that was not found.
        resource: String,
    },

    /// Authentication failed - likely invalid credentials.
    #[error("authentication failed - check AUTOTASK_USERNAME, AUTOTASK_SECRET and AUTOTASK_INTEGRATION_CODE")]
    Authentication,

    /// Input validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The filter expression could not be parsed.
    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// A next page was requested but the server supplied no cursor.
    #[error("no next page available")]
    NoNextPage,

    /// A previous page was requested but the server supplied no cursor.
    #[error("no previous page available")]
    NoPreviousPage,

    /// A cursor URL could not be used as a request target.
    #[error("invalid page cursor: {reason}")]
    InvalidCursor {
        /// Why the cursor was rejected.
        reason: String,
    },
}

impl AutotaskError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        AutotaskError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        AutotaskError::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AutotaskError::Validation(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        AutotaskError::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        AutotaskError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Creates a decode error for a pagination stage.
    pub fn decode(stage: FetchStage, source: serde_json::Error) -> Self {
        AutotaskError::Decode { stage, source }
    }

    /// Creates an invalid cursor error.
    pub fn invalid_cursor(reason: impl Into<String>) -> Self {
        AutotaskError::InvalidCursor {
            reason: reason.into(),
        }
    }

    /// Returns true if the failure is transient and a caller-side retry may succeed.
    ///
    /// The client never retries on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            AutotaskError::RateLimited { .. } => true,
            AutotaskError::Timeout { .. } => true,
            AutotaskError::Http(e) => e.is_timeout() || e.is_connect(),
            AutotaskError::HttpStatus { status, .. } | AutotaskError::Api { status, .. } => {
                status.as_u16() == 429 || status.is_server_error()
            }
            _ => false,
        }
    }

    /// Returns true if this is a rate limit error.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AutotaskError::RateLimited { .. })
            || matches!(self, AutotaskError::HttpStatus { status, .. } if status.as_u16() == 429)
    }

    /// Returns the server-suggested delay before retrying, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AutotaskError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Replaces every occurrence of `secret` in `message` with `[REDACTED]`.
    #[must_use]
    pub fn sanitize_message(message: &str, secret: &str) -> String {
        if secret.is_empty() {
            return message.to_string();
        }
        message.replace(secret, "[REDACTED]")
    }

    /// Returns this error's display message with `secret` redacted.
    #[must_use]
    pub fn sanitized_display(&self, secret: &str) -> String {
        Self::sanitize_message(&self.to_string(), secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_error() {
        let err = AutotaskError::missing_env("AUTOTASK_SECRET");
        assert!(err.to_string().contains("AUTOTASK_SECRET"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validation_error() {
        let err = AutotaskError::validation("page must be at least 1");
        assert_eq!(err.to_string(), "validation error: page must be at least 1");
    }

    #[test]
    fn test_decode_error_names_stage() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = AutotaskError::decode(FetchStage::NextPage, source);
        assert!(err.to_string().starts_with("failed to decode next page response"));

        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = AutotaskError::decode(FetchStage::TargetPage { page: 3 }, source);
        assert!(err.to_string().contains("page 3"));
    }

    #[test]
    fn test_filter_error_converts() {
        let err: AutotaskError = FilterError::missing_operator("Status").into();
        assert!(matches!(err, AutotaskError::Filter(_)));
        assert!(err.to_string().contains("Status"));
    }

    #[test]
    fn test_cursor_errors() {
        assert_eq!(
            AutotaskError::NoPreviousPage.to_string(),
            "no previous page available"
        );
        assert_eq!(AutotaskError::NoNextPage.to_string(), "no next page available");
        assert!(AutotaskError::invalid_cursor("host mismatch")
            .to_string()
            .contains("host mismatch"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(AutotaskError::RateLimited { retry_after: None }.is_retryable());
        assert!(AutotaskError::timeout(Duration::from_secs(60), "GET Tickets/query").is_retryable());
        assert!(AutotaskError::HttpStatus {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: String::new(),
        }
        .is_retryable());
        assert!(!AutotaskError::Authentication.is_retryable());
        assert!(!AutotaskError::NoNextPage.is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let err = AutotaskError::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        };
        assert!(err.is_rate_limit());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert_eq!(AutotaskError::Authentication.retry_after(), None);
    }

    #[test]
    fn test_sanitize_message_removes_secret() {
        let secret = "s3cr3t-value";
        let message = format!("request with Secret {} failed", secret);
        let sanitized = AutotaskError::sanitize_message(&message, secret);
        assert!(!sanitized.contains(secret));
        assert!(sanitized.contains("[REDACTED]"));
    }

    #[test]
    fn test_sanitize_message_empty_secret() {
        let message = "Some error message";
        assert_eq!(AutotaskError::sanitize_message(message, ""), message);
    }

    #[test]
    fn test_api_error_display() {
        let err = AutotaskError::Api {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            message: "Invalid filter field".to_string(),
            errors: vec!["Invalid filter field".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("Invalid filter field"));
    }
}
