//! Per-directory registry of shared lock instances.
//!
//! [`LockRegistry`] keeps one lock instance per name in a `HashMap` protected
//! by a `RwLock`. Repeated requests for the same name get the same `Arc`, so
//! lease state is shared by every in-process caller. The registry belongs to
//! the directory that created it and is dropped with it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Name → lock table owned by a directory.
pub struct LockRegistry<L: ?Sized> {
    locks: RwLock<HashMap<String, Arc<L>>>,
}

impl<L: ?Sized> LockRegistry<L> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Return the lock registered under `name`, creating it with `make` on
    /// first use. Concurrent first requests still yield a single instance.
    pub fn get_or_insert_with(&self, name: &str, make: impl FnOnce() -> Arc<L>) -> Arc<L> {
        if let Some(lock) = self.get(name) {
            return lock;
        }
        let mut locks = self.locks.write().expect("lock poisoned");
        Arc::clone(locks.entry(name.to_string()).or_insert_with(make))
    }

    /// The lock registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<L>> {
        self.locks
            .read()
            .expect("lock poisoned")
            .get(name)
            .map(Arc::clone)
    }

    /// Number of registered locks.
    pub fn len(&self) -> usize {
        self.locks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no lock has been registered.
    pub fn is_empty(&self) -> bool {
        self.locks.read().expect("lock poisoned").is_empty()
    }

    /// Sorted names of all registered locks.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .locks
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl<L: ?Sized> Default for LockRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> std::fmt::Debug for LockRegistry<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockRegistry")
            .field("locks", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease_lock::LeaseLock;
    use crate::traits::Lock;
    use blobdir_store::{BlobStore, InMemoryBlobStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn lease_lock(
        registry: &LockRegistry<LeaseLock>,
        store: &Arc<InMemoryBlobStore>,
        name: &str,
    ) -> Arc<LeaseLock> {
        registry.get_or_insert_with(name, || {
            Arc::new(LeaseLock::new(store.clone(), "idx/", name))
        })
    }

    #[test]
    fn same_name_same_instance() {
        let store = Arc::new(InMemoryBlobStore::new("index"));
        let registry = LockRegistry::<LeaseLock>::new();
        let make = || Arc::new(LeaseLock::new(store.clone(), "", "write.lock"));

        let a = registry.get_or_insert_with("write.lock", make);
        let b = registry.get_or_insert_with("write.lock", make);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);

        let c = registry.get_or_insert_with("commit.lock", || {
            Arc::new(LeaseLock::new(store.clone(), "", "commit.lock"))
        });
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.names(), vec!["commit.lock", "write.lock"]);
    }

    #[test]
    fn make_runs_once_under_contention() {
        let registry = Arc::new(LockRegistry::<AtomicUsize>::new());
        let created = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let created = Arc::clone(&created);
                thread::spawn(move || {
                    registry.get_or_insert_with("write.lock", || {
                        created.fetch_add(1, Ordering::SeqCst);
                        Arc::new(AtomicUsize::new(0))
                    })
                })
            })
            .collect();
        let locks: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(locks.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn concurrent_obtain_through_registry_is_exclusive() {
        let store = Arc::new(InMemoryBlobStore::new("index"));
        let registry = Arc::new(LockRegistry::<LeaseLock>::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let store: Arc<dyn BlobStore> = store.clone();
                thread::spawn(move || {
                    let lock = registry.get_or_insert_with("write.lock", || {
                        Arc::new(LeaseLock::new(store, "idx/", "write.lock"))
                    });
                    lock.obtain()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);

        let lock = registry.get("write.lock").expect("registered");
        assert!(!lock.obtain());
        lock.release().unwrap();
        assert!(lock.obtain());
    }

    #[test]
    fn separate_registries_share_remote_exclusion() {
        let store = Arc::new(InMemoryBlobStore::new("index"));
        let process_a = LockRegistry::new();
        let process_b = LockRegistry::new();

        let a = lease_lock(&process_a, &store, "write.lock");
        let b = lease_lock(&process_b, &store, "write.lock");
        assert!(!Arc::ptr_eq(&a, &b));

        assert!(a.obtain());
        assert!(!b.obtain());
        assert!(b.is_locked());

        a.break_lock();
        assert!(b.obtain());
        assert!(!a.obtain());
    }
}
