//! # Error Handling
//!
//! Custom error type for the relay and its conversion into HTTP responses.
//!
//! ## Where errors go:
//! Very few errors in this service ever reach a client. Remote-call failures
//! (transcription, intent extraction) are logged and replaced by a neutral result,
//! and malformed WebSocket frames are logged and skipped. The HTTP conversion below
//! is used for the plain HTTP surface (unknown routes, status endpoint), and
//! configuration errors stop the process before the server binds.
//!
//! ## Rust Concepts:
//! - **enum variants with data**: Each failure class carries its message
//! - **From trait**: Lets `?` convert library errors into `AppError` automatically
//! - **ResponseError trait**: actix-web turns a returned `AppError` into a response

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the relay.
///
/// ## Error Categories:
/// - **Internal**: Unexpected server-side problems (500)
/// - **BadRequest**: A peer sent something we could not understand (400)
/// - **NotFound**: No route for a plain HTTP request (404)
/// - **Config**: Invalid or missing configuration (500, fatal at startup)
/// - **Upstream**: The speech-to-text or language-model service failed (502)
#[derive(Debug)]
pub enum AppError {
    /// Unexpected server-side failure
    Internal(String),

    /// Malformed inbound message or request
    BadRequest(String),

    /// Requested route does not exist
    NotFound(String),

    /// Configuration file or environment variable problems
    Config(String),

    /// A remote API call failed (network, non-2xx status, unreadable body)
    Upstream(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts relay errors into JSON HTTP responses.
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": {
///     "type": "not_found",
///     "message": "No route for GET /nope",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::Internal(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_type, message) = match self {
            AppError::Internal(msg) => ("internal_error", msg),
            AppError::BadRequest(msg) => ("bad_request", msg),
            AppError::NotFound(msg) => ("not_found", msg),
            AppError::Config(msg) => ("config_error", msg),
            AppError::Upstream(msg) => ("upstream_error", msg),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Automatic conversion from anyhow::Error to AppError.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors almost always mean a peer sent malformed data.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Any failure inside reqwest (connect, timeout, body decode) is an upstream failure.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Upstream(format!("request timed out: {}", err))
        } else {
            AppError::Upstream(err.to_string())
        }
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Upstream("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Config("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_json_error_converts_to_bad_request() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::BadRequest(_)));
        assert!(app_err.to_string().starts_with("Bad request: JSON parsing error"));
    }
}
