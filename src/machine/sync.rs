//! Published view and store change notifications

use super::JobMachine;
use crate::store::WatchCallback;
use crate::types::{Event, JobId, JobRecord, JobState, transition_events};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// State as renderers see it, plus the event channel fed from its changes
///
/// Every publish computes the events implied by the change and broadcasts
/// them while the write lock is held, so subscribers see events in the order
/// the view changed.
pub(crate) struct View {
    state: RwLock<JobState>,
    event_tx: broadcast::Sender<Event>,
}

impl View {
    pub(crate) fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            state: RwLock::new(JobState::default()),
            event_tx,
        }
    }

    pub(crate) fn snapshot(&self) -> JobState {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Replace the view and emit the implied events
    pub(crate) fn publish(&self, next: JobState) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let events = transition_events(&state, &next);
        *state = next;
        for event in events {
            // Ignore send errors - no subscribers is fine
            let _ = self.event_tx.send(event);
        }
    }

    /// Fold a store notification into the view
    ///
    /// Notifications for any job other than the one currently shown are
    /// dropped, which covers late deliveries after a reset or a new analysis.
    pub(crate) fn apply_record(&self, expected: JobId, record: &JobRecord) {
        if record.id != expected {
            return;
        }

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.id != Some(expected) {
            tracing::debug!(
                job_id = %expected,
                shown = ?state.id,
                "Ignoring notification for a job that is no longer shown"
            );
            return;
        }

        let mut next = state.clone();
        next.apply_record(record);
        let events = transition_events(&state, &next);
        *state = next;
        for event in events {
            let _ = self.event_tx.send(event);
        }
    }
}

impl JobMachine {
    /// Store callback that folds changes of job `id` into the view
    pub(crate) fn view_callback(&self, id: JobId) -> WatchCallback {
        let view = Arc::clone(&self.view);
        Arc::new(move |record: &JobRecord| view.apply_record(id, record))
    }
}
