//! Filesystem-backed [`LocalStore`] used as the on-disk cache.
//!
//! Open handles are tracked per file name so that deleting or recreating a
//! file that is still being read or written fails with an I/O error on every
//! platform, not only where the OS enforces sharing rules.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{LocalRead, LocalStore, LocalWrite};

type HandleTable = Arc<Mutex<HashMap<String, usize>>>;

/// Decrements the open-handle count for a name when dropped.
struct HandleGuard {
    table: HandleTable,
    name: String,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().expect("lock poisoned");
        if let Some(count) = table.get_mut(&self.name) {
            *count -= 1;
            if *count == 0 {
                table.remove(&self.name);
            }
        }
    }
}

/// A file handle that keeps its name registered as open.
struct TrackedFile<F> {
    inner: F,
    _guard: HandleGuard,
}

impl<F: Read> Read for TrackedFile<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<F: Seek> Seek for TrackedFile<F> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl<F: Write> Write for TrackedFile<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn in_use(name: &str) -> StoreError {
    StoreError::Io(io::Error::other(format!("cache file {name} is in use")))
}

/// Local cache directory on disk.
pub struct FsLocalStore {
    root: PathBuf,
    handles: HandleTable,
}

impl FsLocalStore {
    /// Open a cache rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened local cache");
        Ok(Self {
            root,
            handles: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[cfg(test)]
    fn is_open(&self, name: &str) -> bool {
        self.handles
            .lock()
            .expect("lock poisoned")
            .contains_key(name)
    }

    fn path(&self, name: &str) -> StoreResult<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid cache file name: {name:?}"),
            )
            .into());
        }
        Ok(self.root.join(name))
    }

    /// Open a file with `open_fn` and register the handle atomically.
    ///
    /// With `replaces` set the open truncates the file, so it is refused
    /// while any other handle onto `name` is open.
    fn tracked<F>(
        &self,
        name: &str,
        replaces: bool,
        open_fn: impl FnOnce(&Path) -> io::Result<F>,
    ) -> StoreResult<TrackedFile<F>> {
        let path = self.path(name)?;
        let mut table = self.handles.lock().expect("lock poisoned");
        if replaces && table.contains_key(name) {
            return Err(in_use(name));
        }
        let inner = open_fn(&path)?;
        *table.entry(name.to_string()).or_insert(0) += 1;
        Ok(TrackedFile {
            inner,
            _guard: HandleGuard {
                table: Arc::clone(&self.handles),
                name: name.to_string(),
            },
        })
    }
}

impl LocalStore for FsLocalStore {
    fn create(&self, name: &str) -> StoreResult<LocalWrite> {
        let file = self.tracked(name, true, |p| File::create(p).map(BufWriter::new))?;
        Ok(Box::new(file))
    }

    fn create_new(&self, name: &str) -> StoreResult<bool> {
        let path = self.path(name)?;
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn open(&self, name: &str) -> StoreResult<Box<dyn LocalRead>> {
        let file = self.tracked(name, false, |p| File::open(p))?;
        Ok(Box::new(file))
    }

    fn exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.path(name)?.is_file())
    }

    fn length(&self, name: &str) -> StoreResult<u64> {
        Ok(fs::metadata(self.path(name)?)?.len())
    }

    fn modified(&self, name: &str) -> StoreResult<DateTime<Utc>> {
        let modified = fs::metadata(self.path(name)?)?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn delete(&self, name: &str) -> StoreResult<bool> {
        let path = self.path(name)?;
        let table = self.handles.lock().expect("lock poisoned");
        if table.contains_key(name) {
            return Err(in_use(name));
        }
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for FsLocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsLocalStore")
            .field("root", &self.root)
            .finish()
    }
}
