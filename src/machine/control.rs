//! Format selection, reset, failure and shutdown.

use super::{JobMachine, Working, invalid_state};
use crate::catalog::find_option;
use crate::error::{Error, Result};
use crate::types::{JobId, JobPatch, JobState, Status};
use std::sync::atomic::Ordering;

impl JobMachine {
    /// Choose a catalog entry for the current (or next) job
    ///
    /// Allowed while idle, analyzing or ready. Selecting the entry that is
    /// already selected changes nothing and emits nothing.
    pub async fn select_format(&self, format: &str) -> Result<()> {
        let option = find_option(format).ok_or_else(|| Error::UnknownFormat(format.to_string()))?;

        let mut working = self.working.lock().await;
        match working.state.status {
            Status::Idle | Status::Analyzing | Status::Ready => {}
            status => return Err(invalid_state("select format", status)),
        }

        if working.state.format.as_deref() == Some(option.id) {
            return Ok(());
        }

        let next = JobState {
            format: Some(option.id.to_string()),
            ..working.state.clone()
        };
        self.publish_local(&mut working, next);

        tracing::debug!(format = option.id, job_id = ?working.state.id, "Format selected");
        Ok(())
    }

    /// Return to `idle`, dropping the current job
    ///
    /// Rejected while analyzing or downloading. Cancels pending timers and
    /// unregisters the store watch, so late notifications for the old job
    /// never reach the view.
    pub async fn reset(&self) -> Result<()> {
        let mut working = self.working.lock().await;
        let status = working.state.status;
        if matches!(status, Status::Analyzing | Status::Downloading) {
            return Err(invalid_state("reset", status));
        }

        let previous = working.state.id;
        self.clear_job(&mut working);
        self.publish_local(&mut working, JobState::default());

        tracing::info!(job_id = ?previous, "Job reset");
        Ok(())
    }

    /// Move the current job to `error` with `message`
    ///
    /// Used for failures raised outside the machine, for example a front end
    /// that could not start the analysis. Timers are cancelled; the job stays
    /// in `error` until [`reset`](Self::reset). Rejected once the job is
    /// `complete` or already in `error`.
    pub async fn fail(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        let mut working = self.working.lock().await;
        let status = working.state.status;
        if status.is_terminal() {
            return Err(invalid_state("fail", status));
        }
        self.fail_locked(&mut working, &message).await;
        Ok(())
    }

    /// Fail job `id` if it is still the current, unfinished job
    pub(crate) async fn fail_job(&self, id: JobId, message: &str) {
        let mut working = self.working.lock().await;
        if working.state.id != Some(id) || working.state.status.is_terminal() {
            return;
        }
        self.fail_locked(&mut working, message).await;
    }

    pub(crate) async fn fail_locked(&self, working: &mut Working, message: &str) {
        if let Some(token) = working.timer.take() {
            token.cancel();
        }

        let next = JobState {
            status: Status::Error,
            result_url: None,
            error: Some(message.to_string()),
            ..working.state.clone()
        };
        let patch = JobPatch {
            status: Some(Status::Error),
            result_url: Some(None),
            error: Some(Some(message.to_string())),
            ..Default::default()
        };

        if let Err(e) = self.write(working, next.clone(), patch).await {
            // The record can't take the failure, show it anyway
            tracing::warn!(job_id = ?next.id, error = %e, "Failed to persist job failure");
            self.publish_local(working, next);
        }

        tracing::warn!(job_id = ?working.state.id, message, "Job failed");
    }

    /// Stop accepting new jobs and cancel timers
    ///
    /// The current view is left as it is; a running download stops where it
    /// is without reaching `complete`.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down job machine");
        self.accepting_new.store(false, Ordering::SeqCst);

        let mut working = self.working.lock().await;
        self.clear_job(&mut working);

        tracing::info!("Job machine shut down");
        Ok(())
    }
}
