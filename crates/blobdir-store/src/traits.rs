use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::lease::{LeaseDuration, LeaseId};

/// Key/value metadata attached to a remote object.
pub type Metadata = BTreeMap<String, String>;

/// Properties of a remote object, fetched without downloading its content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobProperties {
    /// Stored (possibly compressed) size in bytes.
    pub content_length: u64,
    /// Time of the last upload or metadata change.
    pub last_modified: DateTime<Utc>,
    pub metadata: Metadata,
}

/// Remote object store scoped to a single container.
///
/// Keys are flat strings; `/` has no meaning to the store beyond prefix
/// listing. Implementations must be safe to share across threads.
///
/// Lease rules every backend follows:
/// - At most one active lease per object.
/// - Uploading to, deleting, or changing metadata of a leased object fails
///   with [`StoreError::LeaseConflict`](crate::StoreError::LeaseConflict).
/// - Lease operations on a missing object fail with a not-found error.
pub trait BlobStore: Send + Sync {
    /// Name of the container this store is bound to.
    fn container(&self) -> &str;

    /// Create the container if it does not exist yet.
    fn ensure_container(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Check whether an object exists.
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Fetch length, modification time, and metadata of an object.
    fn properties(&self, key: &str) -> StoreResult<BlobProperties>;

    /// Stream an object's content into `sink`. Returns the bytes written.
    fn download(&self, key: &str, sink: &mut dyn Write) -> StoreResult<u64>;

    /// Create or replace an object with exactly `length` bytes from `source`.
    ///
    /// Replacing an object clears its metadata.
    fn upload(&self, key: &str, source: &mut dyn Read, length: u64) -> StoreResult<()>;

    /// Replace the metadata of an existing object.
    fn set_metadata(&self, key: &str, metadata: &Metadata) -> StoreResult<()>;

    /// Delete an object. Returns `true` if it existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// List the keys of all objects starting with `prefix`.
    fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Acquire a lease on an object.
    ///
    /// Presenting the ID of the lease that is already active renews it.
    fn acquire_lease(
        &self,
        key: &str,
        duration: LeaseDuration,
        proposed: Option<&LeaseId>,
    ) -> StoreResult<LeaseId>;

    /// Extend an active lease by its original duration.
    fn renew_lease(&self, key: &str, lease: &LeaseId) -> StoreResult<()>;

    /// Release an active lease held under `lease`.
    fn release_lease(&self, key: &str, lease: &LeaseId) -> StoreResult<()>;

    /// End any lease on the object, whoever holds it.
    fn break_lease(&self, key: &str) -> StoreResult<()>;

    /// Download an object fully into memory.
    fn download_bytes(&self, key: &str) -> StoreResult<Bytes> {
        let mut buf = Vec::new();
        self.download(key, &mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Upload an in-memory payload.
    fn upload_bytes(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        self.upload(key, &mut Cursor::new(data), data.len() as u64)
    }
}

/// Readable, seekable handle onto a cached file.
pub trait LocalRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> LocalRead for T {}

/// Writable handle onto a cached file. Dropping the handle closes the file.
pub type LocalWrite = Box<dyn Write + Send>;

/// Local on-disk cache addressed by flat file names.
pub trait LocalStore: Send + Sync {
    /// Create (or truncate) a file for writing. Fails while any handle onto
    /// the file is open.
    fn create(&self, name: &str) -> StoreResult<LocalWrite>;

    /// Create an empty file only if none exists. Returns `false` if it did.
    fn create_new(&self, name: &str) -> StoreResult<bool>;

    /// Open a file for reading.
    fn open(&self, name: &str) -> StoreResult<Box<dyn LocalRead>>;

    fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Length of a file in bytes.
    fn length(&self, name: &str) -> StoreResult<u64>;

    /// Last modification time of a file.
    fn modified(&self, name: &str) -> StoreResult<DateTime<Utc>>;

    /// Delete a file. Returns `false` if it did not exist.
    ///
    /// Fails with an I/O error while the file is still open.
    fn delete(&self, name: &str) -> StoreResult<bool>;

    /// Names of all files in the store.
    fn list(&self) -> StoreResult<Vec<String>>;
}
