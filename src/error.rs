//! Error types for prepdiff operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PrepdiffError>;

#[derive(Error, Debug)]
pub enum PrepdiffError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Row not found: {id}")]
    RowNotFound { id: i64 },

    #[error("Insertion index {index} out of bounds (row count {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Preview request failed: {message}")]
    Upstream { message: String },

    #[error("Preview cancelled")]
    Cancelled,

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl PrepdiffError {
    pub fn row_not_found(id: i64) -> Self {
        Self::RowNotFound { id }
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream {
            message: msg.into(),
        }
    }

    /// True when the error is a caller-driven cancellation rather than a
    /// genuine failure. Callers use this to skip user-facing error reporting.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
