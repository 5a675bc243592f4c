use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("cache error: {0}")]
    Cache(#[from] ofb_cache::CacheError),

    #[error("remote error: {0}")]
    Remote(#[from] ofb_remote::RemoteError),

    #[error("invalid value: {0}")]
    Type(#[from] ofb_types::TypeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
