use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid export value at {path}: {reason}")]
    InvalidExport { path: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
