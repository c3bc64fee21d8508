//! Link validation and the simulated analysis delay

use super::{JobMachine, invalid_state};
use crate::error::{Error, JobError, Result};
use crate::types::{JobId, JobState, Status};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

impl JobMachine {
    /// Submit a link for analysis
    ///
    /// Accepted from `idle` and `ready`, and from `error` while no job exists
    /// (a previously rejected link). A link that fails the URL check moves
    /// the machine to `error` with the configured message and creates no job.
    /// Otherwise a new job id is assigned, the status becomes `analyzing`, and
    /// the job turns `ready` after the analysis delay.
    pub async fn analyze(&self, input: &str) -> Result<JobId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let mut working = self.working.lock().await;
        match working.state.status {
            Status::Idle | Status::Ready => {}
            Status::Error if working.state.id.is_none() => {}
            status => return Err(invalid_state("analyze", status)),
        }

        self.clear_job(&mut working);
        let url = input.trim();

        if !self.matcher.is_supported(url) {
            let message = self.config.job.invalid_url_message.clone();
            tracing::debug!(input = %url, "Rejected link");

            let next = JobState {
                url: url.to_string(),
                format: working.state.format.clone(),
                status: Status::Error,
                error: Some(message.clone()),
                ..Default::default()
            };
            self.publish_local(&mut working, next);
            return Err(Error::InvalidUrl(message));
        }

        let id = JobId::generate();
        let next = JobState {
            id: Some(id),
            url: url.to_string(),
            format: working.state.format.clone(),
            status: Status::Analyzing,
            created_at: Some(chrono::Utc::now()),
            ..Default::default()
        };
        self.publish_local(&mut working, next);

        let token = CancellationToken::new();
        working.timer = Some(token.clone());
        drop(working);

        tracing::info!(job_id = %id, url, "Analyzing link");

        let machine = self.clone();
        tokio::spawn(async move {
            machine.run_analysis(id, token).await;
        });

        Ok(id)
    }

    async fn run_analysis(&self, id: JobId, token: CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.simulation.analysis_delay) => {
                if let Err(e) = self.finish_analysis(id).await {
                    tracing::debug!(job_id = %id, error = %e, "Analysis result discarded");
                }
            }
            _ = token.cancelled() => {
                tracing::debug!(job_id = %id, "Analysis cancelled");
            }
        }
    }

    /// Move job `id` from `analyzing` to `ready`
    pub(crate) async fn finish_analysis(&self, id: JobId) -> Result<()> {
        let mut working = self.working.lock().await;
        if working.state.id != Some(id) || working.state.status != Status::Analyzing {
            return Err(Error::Job(JobError::Stale { id: id.get() }));
        }

        let next = JobState {
            status: Status::Ready,
            progress: 0.0,
            error: None,
            ..working.state.clone()
        };
        working.timer = None;
        self.publish_local(&mut working, next);

        tracing::info!(job_id = %id, "Analysis complete");
        Ok(())
    }
}
