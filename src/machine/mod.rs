//! Job state machine split into focused submodules.
//!
//! The `JobMachine` struct and its methods are organized by concern:
//! - [`analyze`] - Link validation and the simulated analysis delay
//! - [`download`] - Download start, identity gate and the progress ticker
//! - [`control`] - Format selection, reset, failure and shutdown
//! - [`sync`] - Published view and store change notifications
//!
//! Status flow: `idle → analyzing → ready → downloading → complete`, with
//! `error` reachable from anywhere. `complete` and `error` are left only
//! through [`JobMachine::reset`].

mod analyze;
mod control;
mod download;
mod sync;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, JobError, Result};
use crate::identity::IdentityProvider;
use crate::store::{JobStore, Subscription};
use crate::types::{Event, JobPatch, JobState, Status, UserId};
use crate::url_check::UrlMatcher;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

pub(crate) use sync::View;

/// Message shown when starting or continuing a download fails
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Download failed. Please try again.";

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// External collaborators of the persisted variant
///
/// Both are optional: without a store the machine runs the local variant,
/// without an identity provider every job belongs to no user (or to
/// [`UserId::local`] when a store is attached).
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Job document store
    pub store: Option<Arc<dyn JobStore>>,
    /// Identity provider gating download start
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

/// The persisted job currently tracked by the machine
pub(crate) struct PersistedJob {
    /// Namespace the record lives under
    pub(crate) user: UserId,
    /// Watch on the record; dropping it unregisters
    pub(crate) subscription: Subscription,
}

/// Mutable state guarded by the machine's lock
#[derive(Default)]
pub(crate) struct Working {
    /// Authoritative state used to validate transitions
    pub(crate) state: JobState,
    /// Cancels the pending analysis delay or the running ticker
    pub(crate) timer: Option<CancellationToken>,
    /// Store record and watch, once a persisted download started
    pub(crate) persisted: Option<PersistedJob>,
}

/// Job state machine (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct JobMachine {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Compiled URL check for the accepted hosts
    pub(crate) matcher: Arc<UrlMatcher>,
    /// Optional document store (persisted variant)
    pub(crate) store: Option<Arc<dyn JobStore>>,
    /// Optional identity provider
    pub(crate) identity: Option<Arc<dyn IdentityProvider>>,
    /// Transition lock; held across store writes so transitions are serialised
    pub(crate) working: Arc<tokio::sync::Mutex<Working>>,
    /// What renderers see, plus the event channel
    pub(crate) view: Arc<View>,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl JobMachine {
    /// Create a machine running the local variant
    pub fn new(config: Config) -> Result<Self> {
        Self::with_collaborators(config, Collaborators::default())
    }

    /// Create a machine with an explicit store and/or identity provider
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use vidgrab::{Collaborators, Config, JobMachine};
    /// use vidgrab::identity::StaticIdentity;
    /// use vidgrab::store::MemoryStore;
    ///
    /// let machine = JobMachine::with_collaborators(
    ///     Config::default(),
    ///     Collaborators {
    ///         store: Some(Arc::new(MemoryStore::new())),
    ///         identity: Some(Arc::new(StaticIdentity::signed_in("user-1"))),
    ///     },
    /// )
    /// .unwrap();
    /// assert!(machine.is_persisted());
    /// ```
    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let matcher = UrlMatcher::new(&config.job.accepted_hosts)?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        if let Some(store) = &collaborators.store {
            tracing::info!(store = store.name(), "Job machine using persisted variant");
        }
        if let Some(identity) = &collaborators.identity {
            tracing::info!(
                identity = identity.name(),
                require_identity = config.job.require_identity,
                "Identity provider attached"
            );
        }

        Ok(Self {
            config: Arc::new(config),
            matcher: Arc::new(matcher),
            store: collaborators.store,
            identity: collaborators.identity,
            working: Arc::new(tokio::sync::Mutex::new(Working::default())),
            view: Arc::new(View::new(event_tx)),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Current state as a renderer should draw it
    ///
    /// In the persisted variant this reflects the last store notification,
    /// not the machine's own writes.
    pub fn snapshot(&self) -> JobState {
        self.view.snapshot()
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.view.subscribe()
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a job store is attached
    pub fn is_persisted(&self) -> bool {
        self.store.is_some()
    }

    /// Replace the working state and publish it directly to the view
    pub(crate) fn publish_local(&self, working: &mut Working, next: JobState) {
        working.state = next.clone();
        self.view.publish(next);
    }

    /// Apply a transition that may already be persisted
    ///
    /// With a tracked record, `patch` goes to the store and the view follows
    /// from the change notification. Otherwise `next` is published locally.
    pub(crate) async fn write(
        &self,
        working: &mut Working,
        next: JobState,
        patch: JobPatch,
    ) -> Result<()> {
        match (&self.store, &working.persisted, next.id) {
            (Some(store), Some(persisted), Some(id)) => {
                store.put(&persisted.user, id, &patch).await?;
                working.state = next;
                Ok(())
            }
            _ => {
                self.publish_local(working, next);
                Ok(())
            }
        }
    }

    /// Cancel timers and drop the store watch of the current job
    pub(crate) fn clear_job(&self, working: &mut Working) {
        if let Some(token) = working.timer.take() {
            token.cancel();
        }
        if let Some(persisted) = working.persisted.take() {
            persisted.subscription.unsubscribe();
        }
    }
}

pub(crate) fn invalid_state(operation: &str, status: Status) -> Error {
    Error::Job(JobError::InvalidState {
        operation: operation.to_string(),
        current_state: status.to_string(),
    })
}
