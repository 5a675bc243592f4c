/// Errors from durable storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The write would exceed the medium's capacity.
    #[error("storage quota exceeded writing {key}: {required} bytes required, limit {limit}")]
    QuotaExceeded {
        key: String,
        required: usize,
        limit: usize,
    },

    /// Serialization or deserialization failure of the backing file.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
