use axum::{http::StatusCode, response::IntoResponse};
use murmur_types::{EventError, IdError, TopicError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Application error type shared by every Murmur component
///
/// Client-caused failures (validation, missing target, wrong actor) are
/// rejected before any mutation happens. `TransientStore` is the only variant
/// a caller should retry.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Client Errors =====
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot open a conversation with yourself")]
    InvalidPair,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource conflict: {0}")]
    Conflict(String),

    #[error("Not allowed: {0}")]
    Authorization(String),

    #[error("Principal is not a participant of conversation {0}")]
    NotAParticipant(String),

    // ===== Storage Errors =====
    #[error("Storage temporarily unavailable: {0}")]
    TransientStore(String),

    // ===== Serialization Errors =====
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Config(String),

    // ===== Internal Server Errors =====
    #[error("Internal server error: {0}")]
    Internal(String),

    // ===== Unknown/Generic Errors =====
    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidPair | AppError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Authorization(_) | AppError::NotAParticipant(_) => StatusCode::FORBIDDEN,
            AppError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message (without sensitive details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => format!("Validation error: {}", msg),
            AppError::InvalidPair => "Cannot chat with yourself".to_string(),
            AppError::NotFound(msg) => format!("Not found: {}", msg),
            AppError::Conflict(msg) => format!("Conflict: {}", msg),
            AppError::Authorization(msg) => format!("Not allowed: {}", msg),
            AppError::NotAParticipant(_) => "Access denied".to_string(),
            AppError::TransientStore(_) => "Storage temporarily unavailable, retry later".to_string(),
            AppError::Json(_) => "Malformed JSON payload".to_string(),
            AppError::Config(msg) => format!("Configuration error: {}", msg),
            _ => "Internal server error".to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidPair => "INVALID_PAIR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Authorization(_) => "FORBIDDEN",
            AppError::NotAParticipant(_) => "NOT_A_PARTICIPANT",
            AppError::TransientStore(_) => "STORE_UNAVAILABLE",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransientStore(_))
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::FORBIDDEN {
            tracing::warn!(
                error = %self,
                error_code = %code,
                "Actor not allowed"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                "Client error occurred"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let error_code = self.error_code();

        let response_body = if status.is_server_error() {
            // For server errors, don't expose internal details to client
            json!({
                "error": if self.is_retryable() { self.user_message() } else { "Internal server error".to_string() },
                "error_code": error_code,
                "status": status.as_u16(),
                "retryable": self.is_retryable(),
            })
        } else {
            json!({
                "error": self.user_message(),
                "error_code": error_code,
                "status": status.as_u16(),
            })
        };

        (status, axum::Json(response_body)).into_response()
    }
}

// ============================================================================
// Conversion from common error types
// ============================================================================

impl From<IdError> for AppError {
    fn from(err: IdError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<TopicError> for AppError {
    fn from(err: TopicError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        AppError::Internal(err.to_string())
    }
}

// ============================================================================
// Helper functions for creating common errors
// ============================================================================

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Create a conflict error (409)
    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    /// Create an authorization error (403)
    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Authorization(msg.into())
    }

    /// Create a retryable storage error
    pub fn transient(msg: impl Into<String>) -> Self {
        AppError::TransientStore(msg.into())
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }
}
