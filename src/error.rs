//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is absent or its TTL has elapsed
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored payload cannot be interpreted as requested
    #[error("Cannot decode value of '{key}': {reason}")]
    Decode { key: String, reason: String },

    /// Value could not be serialized before storing
    #[error("Cannot encode value: {0}")]
    Encode(String),

    /// Networked backend could not be reached while constructing it
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A round trip to the networked backend failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller-supplied compute step of a compute-if-absent call failed
    #[error(transparent)]
    Compute(#[from] anyhow::Error),
}

impl CacheError {
    pub(crate) fn decode(key: &str, reason: impl ToString) -> Self {
        CacheError::Decode {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for misses, which are expected in normal operation.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
