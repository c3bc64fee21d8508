//! Shared test helpers for creating JobMachine instances in tests.

use crate::config::{Config, ProgressSchedule};
use crate::error::{DatabaseError, Error, Result};
use crate::identity::StaticIdentity;
use crate::machine::{Collaborators, JobMachine};
use crate::store::{JobStore, MemoryStore, Subscription, WatchCallback};
use crate::types::{Event, JobId, JobPatch, JobRecord, JobState, Status, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const VALID_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Short delays and a fixed 25-point step: four ticks to completion
pub(crate) fn fast_config() -> Config {
    let mut config = Config::default();
    config.simulation.analysis_delay = Duration::from_millis(100);
    config.simulation.tick_interval = Duration::from_millis(50);
    config.simulation.schedule = ProgressSchedule::Fixed { step: 25.0 };
    config
}

/// Local-variant machine with [`fast_config`]
pub(crate) fn create_test_machine() -> JobMachine {
    JobMachine::new(fast_config()).unwrap()
}

/// Persisted-variant machine signed in as `user-1`
pub(crate) fn create_persisted_machine(store: Arc<dyn JobStore>) -> JobMachine {
    JobMachine::with_collaborators(
        fast_config(),
        Collaborators {
            store: Some(store),
            identity: Some(Arc::new(StaticIdentity::signed_in("user-1"))),
        },
    )
    .unwrap()
}

/// Poll the view until it reaches `status`
pub(crate) async fn wait_for_status(machine: &JobMachine, status: Status) -> JobState {
    for _ in 0..2000 {
        let state = machine.snapshot();
        if state.status == status {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "job never reached {status}, last state: {:?}",
        machine.snapshot()
    );
}

/// Analyze [`VALID_URL`], pick `format` and wait until the job is ready
pub(crate) async fn ready_job(machine: &JobMachine, format: &str) -> JobId {
    let id = machine.analyze(VALID_URL).await.unwrap();
    machine.select_format(format).await.unwrap();
    wait_for_status(machine, Status::Ready).await;
    id
}

/// Everything currently buffered in `rx`
pub(crate) fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Memory store whose writes start failing after `healthy_writes` successes
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    healthy_writes: usize,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new(healthy_writes: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            healthy_writes,
            writes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn watcher_count(&self, user: &UserId, id: JobId) -> usize {
        self.inner.watchers().watcher_count(user, id)
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn put(&self, user: &UserId, id: JobId, patch: &JobPatch) -> Result<JobRecord> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.healthy_writes {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "simulated outage".to_string(),
            )));
        }
        self.inner.put(user, id, patch).await
    }

    async fn get(&self, user: &UserId, id: JobId) -> Result<Option<JobRecord>> {
        self.inner.get(user, id).await
    }

    fn watch(&self, user: &UserId, id: JobId, callback: WatchCallback) -> Subscription {
        self.inner.watch(user, id, callback)
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}
