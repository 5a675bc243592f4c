use ofb_remote::RemoteError;
use ofb_storage::StorageError;
use ofb_types::TypeError;

/// Errors from offline cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A stored fragment is not valid JSON, or not a fragment.
    #[error("cannot decode fragment {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A fragment could not be encoded.
    #[error("cannot encode fragment {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The durable storage medium failed (including quota exhaustion).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The remote store refused or failed an operation.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A tree value could not be parsed.
    #[error("invalid tree value: {0}")]
    Type(#[from] TypeError),

    /// The cache configuration is unusable.
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Returns `true` if the storage medium ran out of space.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::Storage(StorageError::QuotaExceeded { .. }))
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
