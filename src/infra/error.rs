//! Error types for proof gateway infrastructure

use thiserror::Error;

use crate::domain::DecodeError;

/// Errors that can occur in the gateway infrastructure
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stream payload could not be decoded into a proof
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Client-supplied argument is invalid
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Event stream (broker/subscription) error
    #[error("stream error: {0}")]
    Stream(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same operation might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Database(e) => super::is_retryable_db_error(e),
            _ => false,
        }
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
