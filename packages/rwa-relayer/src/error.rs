//! Error types for the relayer.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

/// Relayer error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No relayer key is configured; nothing can be signed.
    NotConfigured(String),
    /// Configuration error (missing or malformed address, bad URL, chain mismatch).
    Config(String),
    /// Request body rejected before any network call.
    Validation(String),
    /// Signing or broadcast failed. Message is passed through from the node.
    Submission(String),
    /// RPC communication error.
    Rpc(String),
    /// A submission or receipt wait exceeded its deadline.
    Timeout(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotConfigured(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Submission(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Rpc(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Nonce-related broadcast failures invalidate the cached nonce.
    pub(crate) fn is_nonce_error(&self) -> bool {
        match self {
            Error::Submission(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("nonce too low")
                    || msg.contains("nonce too high")
                    || msg.contains("replacement transaction underpriced")
                    || msg.contains("already known")
            }
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotConfigured(msg) => write!(f, "relayer not configured: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Validation(msg) => write!(f, "{msg}"),
            Error::Submission(msg) => write!(f, "submission failed: {msg}"),
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::Timeout(msg) => write!(f, "timed out: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string()
        });
        (self.status(), Json(body)).into_response()
    }
}
