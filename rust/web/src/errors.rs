//! HTTP-facing error handling for fourinrow_web
//!
//! Failures that happen before a WebSocket exists (bad upgrade requests)
//! are answered with a JSON [`ErrorResponse`]. Failures after the upgrade
//! travel as protocol `error` messages instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// JSON body returned for every HTTP-level failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "missing_username")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Log level classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Caller mistakes (4xx)
    Client,
    /// Our failures (5xx)
    Server,
    /// Shared state can no longer be trusted
    Critical,
}

/// Conversion of domain errors into logged HTTP responses
pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self.error_details() {
            Some(details) => {
                ErrorResponse::with_details(self.error_code(), self.error_message(), details)
            }
            None => ErrorResponse::new(self.error_code(), self.error_message()),
        }
    }

    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let body = self.to_error_response();

        match self.severity() {
            ErrorSeverity::Client => {
                tracing::info!(code = %body.error, status = status.as_u16(), "{}", body.message)
            }
            ErrorSeverity::Server => {
                tracing::error!(code = %body.error, status = status.as_u16(), "{}", body.message)
            }
            ErrorSeverity::Critical => tracing::error!(
                code = %body.error,
                status = status.as_u16(),
                critical = true,
                "{}",
                body.message
            ),
        }

        body.into_response(status)
    }
}
