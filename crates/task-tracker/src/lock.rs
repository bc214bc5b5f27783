//! Per-resource mutual exclusion
//!
//! `KeyedLock` maps resource keys to async mutexes. Two operations on the same
//! key never overlap; operations on different keys never wait on each other.
//! The guard is the release handle: dropping it (or calling `release`) frees
//! exactly the mutex it was acquired from, once.
//!
//! Entries are created lazily. With `Retention::Retain` they are never
//! removed, so a key always maps to the same mutex. `Retention::Evict` drops
//! an entry when its last holder releases it; the check runs under the same
//! shard lock acquirers use to clone the entry, so a release cannot race a
//! new acquire onto a different mutex.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

type Registry = DashMap<String, Arc<Mutex<()>>>;

/// What happens to a registry entry once nobody holds or awaits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Keep every entry for the lifetime of the registry
    #[default]
    Retain,
    /// Remove the entry when its last holder releases it
    Evict,
}

/// Registry of per-key mutexes.
#[derive(Debug, Default)]
pub struct KeyedLock {
    entries: Arc<Registry>,
    retention: Retention,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Retention) -> Self {
        Self {
            entries: Arc::default(),
            retention,
        }
    }

    /// Wait until the mutex for `key` is held exclusively.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        // Clone under the shard lock so eviction sees this waiter
        let mutex = self.entries.entry(key.to_owned()).or_default().clone();

        trace!(lock_key = key, "waiting for resource lock");
        let guard = mutex.lock_owned().await;
        debug!(lock_key = key, "resource lock acquired");

        KeyGuard {
            key: key.to_owned(),
            guard: Some(guard),
            evict_from: match self.retention {
                Retention::Retain => None,
                Retention::Evict => Some(self.entries.clone()),
            },
        }
    }

    /// Number of keys currently in the registry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exclusive hold on one key. Released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    evict_from: Option<Arc<Registry>>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock now. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Unlock first so our own Arc no longer counts toward the entry
        drop(self.guard.take());

        if let Some(entries) = self.evict_from.take() {
            let removed = entries
                .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1)
                .is_some();
            if removed {
                trace!(lock_key = %self.key, "evicted idle lock entry");
            }
        }
        debug!(lock_key = %self.key, "resource lock released");
    }
}
