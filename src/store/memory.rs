//! In-process job store.

use super::{JobStore, Subscription, WatchCallback, WatchKey, WatchRegistry};
use crate::error::Result;
use crate::types::{JobId, JobPatch, JobRecord, UserId};
use async_trait::async_trait;
use std::collections::HashMap;

/// Job store backed by a map; contents vanish with the process
#[derive(Default)]
pub struct MemoryStore {
    records: tokio::sync::Mutex<HashMap<WatchKey, JobRecord>>,
    watchers: WatchRegistry,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether no record has been written yet
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// The observer registry, for inspecting live watches
    pub fn watchers(&self) -> &WatchRegistry {
        &self.watchers
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn put(&self, user: &UserId, id: JobId, patch: &JobPatch) -> Result<JobRecord> {
        let merged = {
            let mut records = self.records.lock().await;
            let record = records
                .entry((user.clone(), id))
                .or_insert_with(|| JobRecord::empty(user.clone(), id));
            record.merge(patch);
            record.clone()
        };

        self.watchers.notify(&merged);
        Ok(merged)
    }

    async fn get(&self, user: &UserId, id: JobId) -> Result<Option<JobRecord>> {
        Ok(self.records.lock().await.get(&(user.clone(), id)).cloned())
    }

    fn watch(&self, user: &UserId, id: JobId, callback: WatchCallback) -> Subscription {
        self.watchers.register(user, id, callback)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
