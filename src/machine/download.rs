//! Download start, identity gate and the progress ticker

use super::{DOWNLOAD_FAILED_MESSAGE, JobMachine, PersistedJob, invalid_state};
use crate::catalog::find_option;
use crate::error::{Error, JobError, Result};
use crate::progress::{COMPLETE_PERCENT, ProgressSimulator, Tick};
use crate::types::{JobId, JobPatch, JobState, Status, UserId};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

impl JobMachine {
    /// Start the simulated download of the ready job
    ///
    /// Without a selected format this is a no-op: it returns `Ok(())` and
    /// emits nothing. With identity required and no signed-in user it fails
    /// with [`Error::NotAuthenticated`] and the job stays `ready`.
    ///
    /// In the persisted variant the job record is created here under the
    /// owning user and watched; if that first write fails the job moves to
    /// `error` and the store error is returned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use vidgrab::*;
    /// # async fn example(machine: JobMachine) -> Result<()> {
    /// machine.analyze("https://youtu.be/dQw4w9WgXcQ").await?;
    /// // ... once the job is ready
    /// machine.select_format("mp4-720").await?;
    /// machine.download().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download(&self) -> Result<()> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let mut working = self.working.lock().await;
        let status = working.state.status;
        if status != Status::Ready {
            return Err(invalid_state("download", status));
        }
        let Some(id) = working.state.id else {
            return Err(invalid_state("download", status));
        };
        let Some(format) = working.state.format.clone() else {
            tracing::debug!(job_id = %id, "Download requested without a format, ignoring");
            return Ok(());
        };
        if find_option(&format).is_none() {
            return Err(Error::UnknownFormat(format));
        }

        let user = self.resolve_user().await?;
        let next = JobState {
            status: Status::Downloading,
            progress: 0.0,
            result_url: None,
            error: None,
            user_id: user.clone(),
            ..working.state.clone()
        };

        if let Some(store) = &self.store {
            let owner = user.unwrap_or_else(UserId::local);
            // Watch first so the create notification reaches the view
            let subscription = store.watch(&owner, id, self.view_callback(id));

            if let Err(e) = store.put(&owner, id, &JobPatch::from_state(&next)).await {
                tracing::warn!(job_id = %id, error = %e, "Failed to create job record");
                subscription.unsubscribe();
                let failed = JobState {
                    status: Status::Error,
                    error: Some(DOWNLOAD_FAILED_MESSAGE.to_string()),
                    ..working.state.clone()
                };
                self.publish_local(&mut working, failed);
                return Err(e);
            }

            working.state = next;
            working.persisted = Some(PersistedJob {
                user: owner,
                subscription,
            });
        } else {
            self.publish_local(&mut working, next);
        }

        let token = CancellationToken::new();
        working.timer = Some(token.clone());
        drop(working);

        tracing::info!(job_id = %id, format = %format, "Download started");

        let machine = self.clone();
        tokio::spawn(async move {
            machine.run_ticker(id, token).await;
        });

        Ok(())
    }

    /// The user a new download belongs to
    async fn resolve_user(&self) -> Result<Option<UserId>> {
        let user = match &self.identity {
            Some(provider) => provider.current_user().await,
            None => None,
        };

        if user.is_none() && self.config.job.require_identity {
            tracing::debug!("Download refused, no signed-in user");
            return Err(Error::NotAuthenticated);
        }

        Ok(user)
    }

    async fn run_ticker(&self, id: JobId, token: CancellationToken) {
        let simulation = &self.config.simulation;
        let mut simulator = ProgressSimulator::new(simulation.schedule, simulation.seed);

        let mut interval = tokio::time::interval(simulation.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let tick = simulator.advance();
                    match self.apply_tick(id, tick).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(Error::Job(JobError::Stale { .. })) => {
                            tracing::debug!(job_id = %id, "Ticker stopped, job no longer downloading");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(job_id = %id, error = %e, "Progress write failed");
                            self.fail_job(id, DOWNLOAD_FAILED_MESSAGE).await;
                            break;
                        }
                    }
                }
                _ = token.cancelled() => {
                    tracing::debug!(job_id = %id, "Ticker cancelled");
                    break;
                }
            }
        }
    }

    /// Apply one tick to job `id`; returns whether the ticker should continue
    pub(crate) async fn apply_tick(&self, id: JobId, tick: Tick) -> Result<bool> {
        let mut working = self.working.lock().await;
        if working.state.id != Some(id) || working.state.status != Status::Downloading {
            return Err(Error::Job(JobError::Stale { id: id.get() }));
        }

        match tick {
            Tick::Progress(percent) => {
                let percent = percent
                    .max(working.state.progress)
                    .min(COMPLETE_PERCENT);
                let next = JobState {
                    progress: percent,
                    ..working.state.clone()
                };
                self.write(&mut working, next, JobPatch::progress(percent))
                    .await?;
                Ok(true)
            }
            Tick::Complete => {
                let result_url = if self.config.job.attach_result_locator {
                    working
                        .state
                        .format
                        .as_deref()
                        .map(|format| self.result_locator(id, format))
                } else {
                    None
                };

                let next = JobState {
                    status: Status::Complete,
                    progress: COMPLETE_PERCENT,
                    result_url: result_url.clone(),
                    error: None,
                    ..working.state.clone()
                };
                let patch = JobPatch {
                    status: Some(Status::Complete),
                    progress: Some(COMPLETE_PERCENT),
                    result_url: Some(result_url),
                    error: Some(None),
                    ..Default::default()
                };
                self.write(&mut working, next, patch).await?;
                working.timer = None;

                tracing::info!(job_id = %id, "Download complete");
                Ok(false)
            }
        }
    }

    /// Synthetic locator `{base}/{job_id}/{format_id}.{ext}`
    pub(crate) fn result_locator(&self, id: JobId, format: &str) -> String {
        let extension = find_option(format).map_or("bin", |option| option.extension());
        format!(
            "{}/{}/{}.{}",
            self.config.job.result_base_url.trim_end_matches('/'),
            id,
            format,
            extension
        )
    }
}
