//! Shared error type
//!
//! Errors raised while shaping payloads, identifiers and conversions,
//! before any statement reaches the database.

use thiserror::Error;

use crate::operation::Operation;

pub type Result<T> = std::result::Result<T, Error>;

/// tablekit core error
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Identifier Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("invalid identifier: {reason}")]
    InvalidIdentifier { reason: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Payload Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("empty payload for {operation} on table '{table}'")]
    EmptyPayload { table: String, operation: Operation },

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("{operation} conversion failed: {message}")]
    Conversion { operation: Operation, message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Serialization Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand used by converter implementations.
    pub fn conversion(operation: Operation, message: impl Into<String>) -> Self {
        Error::Conversion {
            operation,
            message: message.into(),
        }
    }

    /// Stable error code for callers that report errors outward
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            Error::EmptyPayload { .. } => "EMPTY_PAYLOAD",
            Error::Conversion { .. } => "CONVERSION_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}
