use thiserror::Error;

/// Errors from cache stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The remote or local store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] blobdir_store::StoreError),

    /// Local I/O, compression, or decompression failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StreamResult<T> = Result<T, StreamError>;
