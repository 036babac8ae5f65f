use std::sync::Arc;
use std::time::Duration;

use blobdir_lock::{LeaseLock, Lock, LockRegistry, DEFAULT_POLL_INTERVAL};
use blobdir_store::{BlobStore, FsLocalStore, LocalStore};
use blobdir_stream::{BlobOutput, CacheContext, CacheInput, CacheMetadata, IndexInput, IndexOutput};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::DirectoryConfig;
use crate::directory::Directory;
use crate::error::{DirectoryError, DirectoryResult};
use crate::identity::DirectoryIdentity;

/// Suffix of the legacy per-file marker kept next to cache files.
const CACHE_MARKER_SUFFIX: &str = ".blob";

/// A directory whose files live in a remote blob store, read and written
/// through a local cache.
///
/// The remote store is authoritative: listing and existence always ask it.
/// Reads are served from the cache after filling it on a miss, and writes
/// land in the cache and upload when the output is closed. Locks are
/// [`LeaseLock`]s on objects under the directory's root prefix.
pub struct BlobDirectory {
    identity: DirectoryIdentity,
    ctx: Arc<CacheContext>,
    locks: LockRegistry<LeaseLock>,
    poll_interval: Duration,
}

impl BlobDirectory {
    pub fn new(
        blob: Arc<dyn BlobStore>,
        local: Arc<dyn LocalStore>,
        identity: DirectoryIdentity,
        compress: bool,
    ) -> Self {
        let ctx = CacheContext::new(blob, local, identity.root_prefix(), compress);
        Self {
            identity,
            ctx: Arc::new(ctx),
            locks: LockRegistry::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Build a directory from configuration, opening the cache directory on
    /// local disk.
    pub fn from_config(blob: Arc<dyn BlobStore>, config: &DirectoryConfig) -> DirectoryResult<Self> {
        let identity = config.identity()?;
        let cache_path = config.cache_path(&identity);
        let local = FsLocalStore::open(&cache_path)?;
        info!(
            directory = %identity,
            cache = %cache_path.display(),
            compress = config.compress_blobs,
            "opened blob directory"
        );
        Ok(Self::new(blob, Arc::new(local), identity, config.compress_blobs)
            .with_poll_interval(config.lock_poll_interval()))
    }

    /// Interval between attempts in [`obtain_lock`](Self::obtain_lock).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn identity(&self) -> &DirectoryIdentity {
        &self.identity
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        self.ctx.blob()
    }

    pub fn cache(&self) -> &Arc<dyn LocalStore> {
        self.ctx.local()
    }

    /// Whether `name` is deflated before upload in this directory.
    pub fn should_compress(&self, name: &str) -> bool {
        self.ctx.should_compress(name)
    }

    /// Original modification time of `name`, or the remote object's own
    /// timestamp when that was never recorded. `None` if it cannot be read.
    pub fn file_modified(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.ctx.blob().properties(&self.ctx.key(name)) {
            Ok(props) => Some(
                CacheMetadata::parse(&props.metadata)
                    .last_modified
                    .unwrap_or(props.last_modified),
            ),
            Err(e) => {
                debug!(name, error = %e, "file_modified lookup failed");
                None
            }
        }
    }

    /// Try to obtain lock `name`, polling until `timeout` elapses.
    pub fn obtain_lock(&self, name: &str, timeout: Duration) -> bool {
        self.make_lock(name).obtain_timeout(timeout, self.poll_interval)
    }

    fn lease_lock(&self, name: &str) -> Arc<LeaseLock> {
        self.locks.get_or_insert_with(name, || {
            Arc::new(LeaseLock::new(
                Arc::clone(self.ctx.blob()),
                self.identity.root_prefix(),
                name,
            ))
        })
    }

    fn remote_length(&self, name: &str) -> Option<u64> {
        match self.ctx.blob().properties(&self.ctx.key(name)) {
            Ok(props) => Some(
                CacheMetadata::parse(&props.metadata)
                    .length
                    .unwrap_or(props.content_length),
            ),
            Err(e) => {
                debug!(name, error = %e, "remote length lookup failed");
                None
            }
        }
    }
}

impl Directory for BlobDirectory {
    fn list_all(&self) -> DirectoryResult<Vec<String>> {
        let prefix = self.identity.root_prefix();
        let names = self
            .ctx
            .blob()
            .list(prefix)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(prefix).map(str::to_string))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .collect();
        Ok(names)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.ctx
            .blob()
            .exists(&self.ctx.key(name))
            .unwrap_or_else(|e| {
                debug!(name, error = %e, "file_exists lookup failed");
                false
            })
    }

    fn file_length(&self, name: &str) -> u64 {
        let local = self.ctx.local();
        if matches!(local.exists(name), Ok(true)) {
            if let Ok(length) = local.length(name) {
                return length;
            }
        }
        self.remote_length(name).unwrap_or(0)
    }

    /// Delete the cache copy, then the remote object.
    ///
    /// If the cache copy cannot be removed (for example because an input is
    /// still open on it) the error is returned and the remote object is left
    /// in place.
    fn delete_file(&self, name: &str) -> DirectoryResult<()> {
        let _guard = self.ctx.guards().acquire(name);
        let local = self.ctx.local();
        local.delete(name)?;
        local.delete(&format!("{name}{CACHE_MARKER_SUFFIX}"))?;

        let key = self.ctx.key(name);
        let existed = self.ctx.blob().delete(&key)?;
        debug!(key = %key, existed, "deleted file");
        Ok(())
    }

    fn create_output(&self, name: &str) -> DirectoryResult<Box<dyn IndexOutput>> {
        Ok(Box::new(BlobOutput::create(Arc::clone(&self.ctx), name)?))
    }

    fn open_input(&self, name: &str) -> DirectoryResult<Box<dyn IndexInput>> {
        let props = self
            .ctx
            .blob()
            .properties(&self.ctx.key(name))
            .map_err(|source| DirectoryError::FileNotFound {
                name: name.to_string(),
                source,
            })?;
        Ok(Box::new(CacheInput::fetch(&self.ctx, name, &props)?))
    }

    fn make_lock(&self, name: &str) -> Arc<dyn Lock> {
        self.lease_lock(name)
    }

    fn clear_lock(&self, name: &str) -> DirectoryResult<()> {
        self.lease_lock(name).break_lock();
        Ok(())
    }
}

impl std::fmt::Debug for BlobDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobDirectory")
            .field("identity", &self.identity)
            .field("compress", &self.ctx.compression_enabled())
            .field("locks", &self.locks.len())
            .finish()
    }
}
