use std::time::Duration;

/// Errors from blob store and local store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// The container backing the store does not exist.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// Another holder has an active lease on the object.
    #[error("lease already present on {key}")]
    LeaseAlreadyPresent { key: String },

    /// The supplied lease ID does not match the active lease.
    #[error("lease ID mismatch on {key}")]
    LeaseIdMismatch { key: String },

    /// A lease operation required an active lease but none exists.
    #[error("no active lease on {key}")]
    LeaseNotPresent { key: String },

    /// A write or delete was attempted on a leased object without its lease.
    #[error("object {key} is leased; operation requires the lease ID")]
    LeaseConflict { key: String },

    /// Fixed lease durations must lie within the store's accepted range.
    #[error("invalid lease duration: {0:?}")]
    InvalidLeaseDuration(Duration),

    /// An upload source yielded fewer bytes than its declared length.
    #[error("short payload for {key}: expected {expected} bytes, got {actual}")]
    ShortPayload {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the failure means the object (or its container) is missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::ContainerNotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub(crate) fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(StoreError::not_found("a").is_not_found());
        assert!(StoreError::ContainerNotFound("c".into()).is_not_found());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(StoreError::Io(io).is_not_found());
        assert!(!StoreError::LeaseAlreadyPresent { key: "a".into() }.is_not_found());
    }

    #[test]
    fn display_includes_key() {
        let err = StoreError::ShortPayload {
            key: "idx/_0.cfs".into(),
            expected: 10,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("idx/_0.cfs"));
        assert!(msg.contains("10"));
    }
}
