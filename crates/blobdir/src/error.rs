use blobdir_store::StoreError;
use thiserror::Error;

/// Errors from directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The file has no remote object (or its metadata could not be fetched).
    #[error("file not found: {name}")]
    FileNotFound {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("invalid directory identity: {0}")]
    InvalidIdentity(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("stream error: {0}")]
    Stream(#[from] blobdir_stream::StreamError),

    #[error("lock error: {0}")]
    Lock(#[from] blobdir_lock::LockError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
