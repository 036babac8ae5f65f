//! Error types for lock operations.

use thiserror::Error;

/// Errors that can occur while renewing or releasing a lock.
///
/// Acquisition never fails with an error; it reports `false` instead.
#[derive(Debug, Error)]
pub enum LockError {
    /// The backing store rejected a lease or marker-file operation.
    #[error("store error: {0}")]
    Store(#[from] blobdir_store::StoreError),
}

/// Convenience type alias for lock operations.
pub type LockResult<T> = std::result::Result<T, LockError>;
