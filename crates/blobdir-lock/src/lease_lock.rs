//! Distributed lock built on the remote store's lease primitive.
//!
//! Each [`LeaseLock`] is bound to one object key (`root prefix + lock name`).
//! Holding the lock means holding an unbounded lease on that object. The lease
//! token lives only in this process; it is never persisted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use blobdir_store::{BlobStore, LeaseDuration, LeaseId, StoreError, StoreResult, MIN_LEASE_DURATION};
use tracing::{debug, warn};

use crate::error::LockResult;
use crate::traits::Lock;

/// Lease length used by [`LeaseLock::is_locked`] to probe availability.
pub const PROBE_LEASE_DURATION: Duration = MIN_LEASE_DURATION;

/// Placeholder-and-retry rounds allowed when the lock object is missing.
const MISSING_OBJECT_RETRIES: usize = 1;

/// A lock held through a lease on a remote object.
pub struct LeaseLock {
    store: Arc<dyn BlobStore>,
    name: String,
    key: String,
    lease: Mutex<Option<LeaseId>>,
}

impl LeaseLock {
    /// Create a lock named `name` stored under `root_prefix`.
    pub fn new(store: Arc<dyn BlobStore>, root_prefix: &str, name: &str) -> Self {
        Self {
            store,
            name: name.to_string(),
            key: format!("{root_prefix}{name}"),
            lease: Mutex::new(None),
        }
    }

    /// The remote object key the lease is taken on.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The lease token currently held by this instance.
    pub fn lease_id(&self) -> Option<LeaseId> {
        self.lease.lock().expect("lock poisoned").clone()
    }

    fn create_placeholder(&self, cause: &StoreError) -> StoreResult<()> {
        if matches!(cause, StoreError::ContainerNotFound(_)) {
            self.store.ensure_container()?;
        }
        self.store.upload_bytes(&self.key, &[])
    }
}

impl Lock for LeaseLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn obtain(&self) -> bool {
        let mut lease = self.lease.lock().expect("lock poisoned");
        if lease.is_some() {
            debug!(key = %self.key, "lock already held by this instance");
            return false;
        }

        for attempt in 0..=MISSING_OBJECT_RETRIES {
            match self
                .store
                .acquire_lease(&self.key, LeaseDuration::Infinite, None)
            {
                Ok(id) => {
                    debug!(key = %self.key, lease = %id, "lock obtained");
                    *lease = Some(id);
                    return true;
                }
                Err(e) if e.is_not_found() && attempt < MISSING_OBJECT_RETRIES => {
                    debug!(key = %self.key, "lock object missing; creating placeholder");
                    if let Err(e) = self.create_placeholder(&e) {
                        warn!(key = %self.key, error = %e, "failed to create lock object");
                        return false;
                    }
                }
                Err(e) => {
                    debug!(key = %self.key, error = %e, "lock not obtained");
                    return false;
                }
            }
        }
        false
    }

    fn renew(&self) -> LockResult<()> {
        let lease = self.lease.lock().expect("lock poisoned");
        if let Some(id) = lease.as_ref() {
            self.store.renew_lease(&self.key, id)?;
            debug!(key = %self.key, "lock renewed");
        }
        Ok(())
    }

    /// Releases the lease. The local token is cleared even if the store
    /// reports an error.
    fn release(&self) -> LockResult<()> {
        let taken = self.lease.lock().expect("lock poisoned").take();
        if let Some(id) = taken {
            self.store.release_lease(&self.key, &id)?;
            debug!(key = %self.key, "lock released");
        }
        Ok(())
    }

    fn break_lock(&self) {
        let mut lease = self.lease.lock().expect("lock poisoned");
        match self.store.break_lease(&self.key) {
            Ok(()) => debug!(key = %self.key, "lock broken"),
            Err(e) => warn!(key = %self.key, error = %e, "failed to break lock; ignoring"),
        }
        *lease = None;
    }

    fn is_locked(&self) -> bool {
        let lease = self.lease.lock().expect("lock poisoned");
        if lease.is_some() {
            return true;
        }
        let probe = LeaseDuration::Fixed(PROBE_LEASE_DURATION);
        match self.store.acquire_lease(&self.key, probe, None) {
            Ok(id) => {
                if let Err(e) = self.store.release_lease(&self.key, &id) {
                    warn!(key = %self.key, error = %e, "failed to release probe lease");
                }
                false
            }
            Err(e) if e.is_not_found() => false,
            Err(_) => true,
        }
    }
}

impl std::fmt::Debug for LeaseLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseLock")
            .field("key", &self.key)
            .field("held", &self.lease_id().is_some())
            .finish()
    }
}
