//! Error types for the kvnotes core library.

use thiserror::Error;

use crate::kv::KvError;

/// Result type alias using the kvnotes core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for kvnotes operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying key-value store failure
    #[error("Store error: {0}")]
    Kv(#[from] KvError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
