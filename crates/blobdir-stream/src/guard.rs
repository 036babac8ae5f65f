//! Per-file-name mutual exclusion for cache mutations.
//!
//! Writers, cache fills, and deletes of the same name take the same guard,
//! so at most one of them touches a given cache file at a time within the
//! process. The guard does not reach other processes.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};

/// Set of names currently guarded, with a condvar to wake waiters.
#[derive(Debug, Default)]
pub struct NameGuards {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl NameGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `name` is free, then take it.
    pub fn acquire(self: &Arc<Self>, name: &str) -> NameGuard {
        let mut held = self.held.lock().expect("lock poisoned");
        while held.contains(name) {
            held = self.released.wait(held).expect("lock poisoned");
        }
        held.insert(name.to_string());
        NameGuard {
            guards: Arc::clone(self),
            name: name.to_string(),
        }
    }

    /// Take `name` only if it is free right now.
    #[cfg(test)]
    fn try_acquire(self: &Arc<Self>, name: &str) -> Option<NameGuard> {
        let mut held = self.held.lock().expect("lock poisoned");
        if !held.insert(name.to_string()) {
            return None;
        }
        Some(NameGuard {
            guards: Arc::clone(self),
            name: name.to_string(),
        })
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().expect("lock poisoned").contains(name)
    }
}

/// Exclusive hold on one name; released on drop.
#[derive(Debug)]
pub struct NameGuard {
    guards: Arc<NameGuards>,
    name: String,
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        let mut held = self.guards.held.lock().expect("lock poisoned");
        held.remove(&self.name);
        self.guards.released.notify_all();
    }
}
