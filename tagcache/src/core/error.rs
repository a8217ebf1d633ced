use thiserror::Error;

/// Main error type for tagcache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Any failure reported by the external store. Wraps the backend's own
    /// message; never retried at this layer.
    #[error("backend I/O error: {0}")]
    Io(String),

    /// The opaque branch could not serialize the value. Raised before any
    /// store call is attempted.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored opaque bytes failed to deserialize. The stored bytes are left
    /// untouched.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A payload with no sentinel and no marker key was not valid decimal
    /// integer text.
    #[error("malformed cached payload: {0}")]
    Format(String),
}

/// Result type alias for tagcache operations
pub type Result<T> = std::result::Result<T, CacheError>;
