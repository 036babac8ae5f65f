use std::sync::Arc;

use blobdir_store::{BlobStore, LocalStore};

use crate::codec;
use crate::guard::NameGuards;

/// Everything a stream needs to move bytes between the cache and the
/// remote store: both stores, the key namespace, the compression flag, and
/// the shared per-name guards. One context is shared by all streams of a
/// directory.
pub struct CacheContext {
    blob: Arc<dyn BlobStore>,
    local: Arc<dyn LocalStore>,
    root_prefix: String,
    compress: bool,
    guards: Arc<NameGuards>,
}

impl CacheContext {
    pub fn new(
        blob: Arc<dyn BlobStore>,
        local: Arc<dyn LocalStore>,
        root_prefix: impl Into<String>,
        compress: bool,
    ) -> Self {
        Self {
            blob,
            local,
            root_prefix: root_prefix.into(),
            compress,
            guards: Arc::new(NameGuards::new()),
        }
    }

    pub fn blob(&self) -> &Arc<dyn BlobStore> {
        &self.blob
    }

    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    pub fn compression_enabled(&self) -> bool {
        self.compress
    }

    pub fn guards(&self) -> &Arc<NameGuards> {
        &self.guards
    }

    /// Remote key of a file: `root prefix + name`.
    pub fn key(&self, name: &str) -> String {
        format!("{}{name}", self.root_prefix)
    }

    pub fn should_compress(&self, name: &str) -> bool {
        codec::should_compress(name, self.compress)
    }
}

impl std::fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("container", &self.blob.container())
            .field("root_prefix", &self.root_prefix)
            .field("compress", &self.compress)
            .finish()
    }
}
