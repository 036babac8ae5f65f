use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::RwLock;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};
use crate::lease::{LeaseDuration, LeaseId};
use crate::traits::{BlobProperties, BlobStore, Metadata};

struct ActiveLease {
    id: LeaseId,
    duration: LeaseDuration,
    expires_at: Option<Instant>,
}

impl ActiveLease {
    fn new(id: LeaseId, duration: LeaseDuration) -> Self {
        let expires_at = duration.as_duration().map(|d| Instant::now() + d);
        Self {
            id,
            duration,
            expires_at,
        }
    }

    fn is_active(&self) -> bool {
        self.expires_at.map_or(true, |t| Instant::now() < t)
    }

    fn renew(&mut self) {
        self.expires_at = self.duration.as_duration().map(|d| Instant::now() + d);
    }
}

struct StoredBlob {
    data: Bytes,
    metadata: Metadata,
    last_modified: DateTime<Utc>,
    lease: Option<ActiveLease>,
}

impl StoredBlob {
    fn active_lease(&self) -> Option<&ActiveLease> {
        self.lease.as_ref().filter(|l| l.is_active())
    }

    fn ensure_unleased(&self, key: &str) -> StoreResult<()> {
        match self.active_lease() {
            Some(_) => Err(StoreError::LeaseConflict {
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Implements the full lease and metadata
/// contract of [`BlobStore`], including lease expiry for fixed durations.
/// Objects are held behind a `RwLock`; content is shared via [`Bytes`].
pub struct InMemoryBlobStore {
    container: String,
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryBlobStore {
    /// Create a new empty store for the given container.
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Whether the object currently carries an unexpired lease.
    pub fn is_leased(&self, key: &str) -> bool {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key)
            .is_some_and(|b| b.active_lease().is_some())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new("default")
    }
}

impl BlobStore for InMemoryBlobStore {
    fn container(&self) -> &str {
        &self.container
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    fn properties(&self, key: &str) -> StoreResult<BlobProperties> {
        let map = self.objects.read().expect("lock poisoned");
        let blob = map.get(key).ok_or_else(|| StoreError::not_found(key))?;
        Ok(BlobProperties {
            content_length: blob.data.len() as u64,
            last_modified: blob.last_modified,
            metadata: blob.metadata.clone(),
        })
    }

    fn download(&self, key: &str, sink: &mut dyn Write) -> StoreResult<u64> {
        // Clone the handle so the sink is written without holding the lock.
        let data = {
            let map = self.objects.read().expect("lock poisoned");
            map.get(key)
                .map(|b| b.data.clone())
                .ok_or_else(|| StoreError::not_found(key))?
        };
        sink.write_all(&data)?;
        Ok(data.len() as u64)
    }

    fn upload(&self, key: &str, source: &mut dyn Read, length: u64) -> StoreResult<()> {
        let mut buf = Vec::with_capacity(length as usize);
        source.take(length).read_to_end(&mut buf)?;
        if (buf.len() as u64) < length {
            return Err(StoreError::ShortPayload {
                key: key.to_string(),
                expected: length,
                actual: buf.len() as u64,
            });
        }

        let mut map = self.objects.write().expect("lock poisoned");
        if let Some(existing) = map.get(key) {
            existing.ensure_unleased(key)?;
        }
        map.insert(
            key.to_string(),
            StoredBlob {
                data: Bytes::from(buf),
                metadata: Metadata::new(),
                last_modified: Utc::now(),
                lease: None,
            },
        );
        Ok(())
    }

    fn set_metadata(&self, key: &str, metadata: &Metadata) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        let blob = map.get_mut(key).ok_or_else(|| StoreError::not_found(key))?;
        blob.ensure_unleased(key)?;
        blob.metadata = metadata.clone();
        blob.last_modified = Utc::now();
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        match map.get(key) {
            Some(blob) => blob.ensure_unleased(key)?,
            None => return Ok(false),
        }
        Ok(map.remove(key).is_some())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn acquire_lease(
        &self,
        key: &str,
        duration: LeaseDuration,
        proposed: Option<&LeaseId>,
    ) -> StoreResult<LeaseId> {
        let duration = duration.validate()?;
        let mut map = self.objects.write().expect("lock poisoned");
        let blob = map.get_mut(key).ok_or_else(|| StoreError::not_found(key))?;

        if let Some(active_id) = blob.active_lease().map(|l| l.id.clone()) {
            if proposed != Some(&active_id) {
                return Err(StoreError::LeaseAlreadyPresent {
                    key: key.to_string(),
                });
            }
            blob.lease = Some(ActiveLease::new(active_id.clone(), duration));
            return Ok(active_id);
        }

        let id = proposed.cloned().unwrap_or_else(LeaseId::generate);
        blob.lease = Some(ActiveLease::new(id.clone(), duration));
        Ok(id)
    }

    fn renew_lease(&self, key: &str, lease: &LeaseId) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        let blob = map.get_mut(key).ok_or_else(|| StoreError::not_found(key))?;
        let active_other = blob.active_lease().is_some_and(|l| &l.id != lease);
        match blob.lease.as_mut() {
            Some(current) if &current.id == lease => {
                current.renew();
                Ok(())
            }
            _ if active_other => Err(StoreError::LeaseIdMismatch {
                key: key.to_string(),
            }),
            _ => Err(StoreError::LeaseNotPresent {
                key: key.to_string(),
            }),
        }
    }

    fn release_lease(&self, key: &str, lease: &LeaseId) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        let blob = map.get_mut(key).ok_or_else(|| StoreError::not_found(key))?;
        let state = blob
            .lease
            .as_ref()
            .map(|l| (&l.id == lease, l.is_active()));
        match state {
            Some((true, _)) => {
                blob.lease = None;
                Ok(())
            }
            Some((false, true)) => Err(StoreError::LeaseIdMismatch {
                key: key.to_string(),
            }),
            _ => Err(StoreError::LeaseNotPresent {
                key: key.to_string(),
            }),
        }
    }

    fn break_lease(&self, key: &str) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        let blob = map.get_mut(key).ok_or_else(|| StoreError::not_found(key))?;
        blob.lease = None;
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("container", &self.container)
            .field("object_count", &self.len())
            .finish()
    }
}
