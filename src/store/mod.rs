//! Job document store
//!
//! The persisted variant writes each job to a [`JobStore`] under the owning
//! user's namespace and learns about changes only through watches. A watch is
//! an explicit registration: [`JobStore::watch`] returns a [`Subscription`]
//! that unregisters on [`Subscription::unsubscribe`] or when dropped.
//!
//! ## Implementations
//! - [`MemoryStore`] - process-local map, no durability
//! - [`SqliteStore`] - SQLite file via sqlx

use crate::error::Result;
use crate::types::{JobId, JobPatch, JobRecord, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Callback invoked with the full merged record after every write to a watched key
pub type WatchCallback = Arc<dyn Fn(&JobRecord) + Send + Sync>;

type WatchKey = (UserId, JobId);

/// Storage for job documents keyed by `(user, job)`
///
/// The contract is deliberately small: create-or-merge a record, read it
/// back, and get told about every change to one key.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create the record if missing, then merge `patch` into it
    ///
    /// Returns the merged record. Watchers of the key are notified after the
    /// write succeeds.
    async fn put(&self, user: &UserId, id: JobId, patch: &JobPatch) -> Result<JobRecord>;

    /// Read one record
    async fn get(&self, user: &UserId, id: JobId) -> Result<Option<JobRecord>>;

    /// Register interest in one record
    fn watch(&self, user: &UserId, id: JobId, callback: WatchCallback) -> Subscription;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    watchers: Mutex<HashMap<WatchKey, Vec<(u64, WatchCallback)>>>,
}

/// Observer registry shared by the store implementations
#[derive(Clone, Default)]
pub struct WatchRegistry {
    inner: Arc<RegistryInner>,
}

impl WatchRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `(user, id)`
    pub fn register(&self, user: &UserId, id: JobId, callback: WatchCallback) -> Subscription {
        let subscription_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let key = (user.clone(), id);

        self.inner
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.clone())
            .or_default()
            .push((subscription_id, callback));

        tracing::debug!(job_id = %id, user_id = %user, subscription_id, "Watch registered");

        Subscription {
            registry: Arc::downgrade(&self.inner),
            key,
            id: subscription_id,
            active: true,
        }
    }

    /// Invoke every callback registered for the record's key
    ///
    /// Callbacks run after the registry lock is released, so they may
    /// register or drop subscriptions themselves.
    pub fn notify(&self, record: &JobRecord) {
        let callbacks: Vec<WatchCallback> = {
            let watchers = self
                .inner
                .watchers
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            match watchers.get(&(record.user_id.clone(), record.id)) {
                Some(list) => list.iter().map(|(_, cb)| cb.clone()).collect(),
                None => return,
            }
        };

        for callback in callbacks {
            callback(record);
        }
    }

    /// Number of live watches on `(user, id)`
    pub fn watcher_count(&self, user: &UserId, id: JobId) -> usize {
        self.inner
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(user.clone(), id))
            .map_or(0, Vec::len)
    }
}

impl RegistryInner {
    fn remove(&self, key: &WatchKey, subscription_id: u64) {
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = watchers.get_mut(key) {
            list.retain(|(id, _)| *id != subscription_id);
            if list.is_empty() {
                watchers.remove(key);
            }
        }
    }
}

/// Handle for one registered watch
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<RegistryInner>,
    key: WatchKey,
    id: u64,
    active: bool,
}

impl Subscription {
    /// The watched job
    pub fn job_id(&self) -> JobId {
        self.key.1
    }

    /// The watched namespace
    pub fn user_id(&self) -> &UserId {
        &self.key.0
    }

    /// Stop receiving notifications
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.key, self.id);
            tracing::debug!(job_id = %self.key.1, subscription_id = self.id, "Watch removed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
