//! Marker-file lock for plain local directories.

use std::sync::{Arc, Mutex};

use blobdir_store::LocalStore;
use tracing::{debug, warn};

use crate::error::LockResult;
use crate::traits::Lock;

/// A lock held by the existence of a marker file created with create-new
/// semantics, so it also excludes other processes sharing the directory.
pub struct FileLock {
    local: Arc<dyn LocalStore>,
    name: String,
    held: Mutex<bool>,
}

impl FileLock {
    pub fn new(local: Arc<dyn LocalStore>, name: &str) -> Self {
        Self {
            local,
            name: name.to_string(),
            held: Mutex::new(false),
        }
    }
}

impl Lock for FileLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn obtain(&self) -> bool {
        let mut held = self.held.lock().expect("lock poisoned");
        if *held {
            return false;
        }
        match self.local.create_new(&self.name) {
            Ok(created) => {
                *held = created;
                created
            }
            Err(e) => {
                debug!(name = %self.name, error = %e, "lock file not created");
                false
            }
        }
    }

    fn renew(&self) -> LockResult<()> {
        Ok(())
    }

    fn release(&self) -> LockResult<()> {
        let mut held = self.held.lock().expect("lock poisoned");
        if *held {
            *held = false;
            self.local.delete(&self.name)?;
        }
        Ok(())
    }

    fn break_lock(&self) {
        let mut held = self.held.lock().expect("lock poisoned");
        if let Err(e) = self.local.delete(&self.name) {
            warn!(name = %self.name, error = %e, "failed to remove lock file; ignoring");
        }
        *held = false;
    }

    fn is_locked(&self) -> bool {
        let held = self.held.lock().expect("lock poisoned");
        *held || self.local.exists(&self.name).unwrap_or(false)
    }
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock").field("name", &self.name).finish()
    }
}
