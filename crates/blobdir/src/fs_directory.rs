use std::path::Path;
use std::sync::Arc;

use blobdir_lock::{FileLock, Lock, LockRegistry};
use blobdir_store::{FsLocalStore, LocalStore};
use blobdir_stream::{CacheInput, IndexInput, IndexOutput, LocalOutput, StreamError};
use tracing::debug;

use crate::directory::Directory;
use crate::error::{DirectoryError, DirectoryResult};

/// A directory backed only by local storage, with marker-file locks.
pub struct FsDirectory {
    local: Arc<dyn LocalStore>,
    locks: LockRegistry<FileLock>,
}

impl FsDirectory {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self {
            local,
            locks: LockRegistry::new(),
        }
    }

    /// Open (creating if needed) a directory rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> DirectoryResult<Self> {
        let local = FsLocalStore::open(path.as_ref())?;
        Ok(Self::new(Arc::new(local)))
    }

    fn file_lock(&self, name: &str) -> Arc<FileLock> {
        self.locks
            .get_or_insert_with(name, || Arc::new(FileLock::new(Arc::clone(&self.local), name)))
    }
}

impl Directory for FsDirectory {
    fn list_all(&self) -> DirectoryResult<Vec<String>> {
        Ok(self.local.list()?)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.local.exists(name).unwrap_or(false)
    }

    fn file_length(&self, name: &str) -> u64 {
        self.local.length(name).unwrap_or(0)
    }

    fn delete_file(&self, name: &str) -> DirectoryResult<()> {
        let existed = self.local.delete(name)?;
        debug!(name, existed, "deleted local file");
        Ok(())
    }

    fn create_output(&self, name: &str) -> DirectoryResult<Box<dyn IndexOutput>> {
        Ok(Box::new(LocalOutput::create(&*self.local, name)?))
    }

    fn open_input(&self, name: &str) -> DirectoryResult<Box<dyn IndexInput>> {
        match CacheInput::open_local(Arc::clone(&self.local), name) {
            Ok(input) => Ok(Box::new(input)),
            Err(StreamError::Store(source)) if source.is_not_found() => {
                Err(DirectoryError::FileNotFound {
                    name: name.to_string(),
                    source,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn make_lock(&self, name: &str) -> Arc<dyn Lock> {
        self.file_lock(name)
    }

    fn clear_lock(&self, name: &str) -> DirectoryResult<()> {
        self.file_lock(name).break_lock();
        Ok(())
    }
}

impl std::fmt::Debug for FsDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsDirectory")
            .field("locks", &self.locks.len())
            .finish()
    }
}
