/// Unified error types for the broadcast service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the broadcast service
///
/// The `Display` text carries internal detail for server-side logs. It is never
/// sent to the caller; see [`BroadcastError::public_message`].
#[derive(Error, Debug)]
pub enum BroadcastError {
    /// Malformed, oversized or invalid request body
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resolved recipient list exceeds the send cap
    #[error("Too many recipients: {count} exceeds limit of {limit}")]
    TooManyRecipients { count: usize, limit: usize },

    /// Missing, invalid or expired credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Valid credential, but not an admin
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Valid pillar with zero employees
    #[error("No recipients found for pillar")]
    NoRecipients,

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Request method other than POST/OPTIONS
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Missing server configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage collaborator errors
    #[error("Database error: {0}")]
    Database(#[from] crate::db::StoreError),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl BroadcastError {
    pub fn status(&self) -> StatusCode {
        match self {
            BroadcastError::InvalidInput(_) | BroadcastError::TooManyRecipients { .. } => {
                StatusCode::BAD_REQUEST
            }
            BroadcastError::Authentication(_) => StatusCode::UNAUTHORIZED,
            BroadcastError::Authorization(_) => StatusCode::FORBIDDEN,
            BroadcastError::NoRecipients => StatusCode::NOT_FOUND,
            BroadcastError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            BroadcastError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            BroadcastError::Configuration(_)
            | BroadcastError::Database(_)
            | BroadcastError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Generic caller-facing message, chosen by status only
    pub fn public_message(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "Invalid request",
            StatusCode::UNAUTHORIZED => "Authentication required",
            StatusCode::FORBIDDEN => "Access denied",
            StatusCode::NOT_FOUND => "No recipients found",
            StatusCode::METHOD_NOT_ALLOWED => "Method not allowed",
            StatusCode::TOO_MANY_REQUESTS => "Too many requests. Please try again later.",
            _ => "Internal server error",
        }
    }
}

/// Convert BroadcastError to HTTP response
impl IntoResponse for BroadcastError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.public_message().to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for broadcast operations
pub type BroadcastResult<T> = Result<T, BroadcastError>;
