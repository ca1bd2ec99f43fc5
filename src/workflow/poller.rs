//! Bounded polling of an analysis job.
//!
//! The job is checked once per `POLL_INTERVAL` until it reports `COMPLETED`
//! or the retry budget runs out. Each tick checks completion before the
//! budget, so a job finishing on the last permitted check still succeeds.
//! A failed status request aborts immediately and does not consume budget.

use crate::client::{AssuranceApi, Session};
use crate::error::WorkflowError;
use crate::models::JobStatusRecord;
use indicatif::{ProgressBar, ProgressStyle};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info};

/// Fixed wait between status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Progress of a single job as seen by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// No status observed yet.
    Pending { retries_left: u32 },
    /// Last observed status was not terminal.
    Running { retries_left: u32, status: String },
    /// Job reported `COMPLETED`.
    Completed(JobStatusRecord),
    /// Budget spent without completion.
    Exhausted { last_status: String },
}

impl PollState {
    pub fn new(retry_budget: NonZeroU32) -> Self {
        PollState::Pending {
            retries_left: retry_budget.get(),
        }
    }

    /// Apply one observed status.
    pub fn observe(self, observed: JobStatusRecord) -> PollState {
        let retries_left = match self {
            PollState::Pending { retries_left } | PollState::Running { retries_left, .. } => {
                retries_left
            }
            terminal => return terminal,
        };

        if observed.is_completed() {
            return PollState::Completed(observed);
        }

        let retries_left = retries_left.saturating_sub(1);
        if retries_left == 0 {
            PollState::Exhausted {
                last_status: observed.analysis_status,
            }
        } else {
            PollState::Running {
                retries_left,
                status: observed.analysis_status,
            }
        }
    }
}

/// Number of status checks that fit into `timeout` at the fixed interval (at least one).
pub fn retry_budget_for(timeout: Duration) -> NonZeroU32 {
    let interval = POLL_INTERVAL.as_secs().max(1);
    let checks = timeout.as_secs().div_ceil(interval);
    let checks = u32::try_from(checks).unwrap_or(u32::MAX);
    NonZeroU32::new(checks).unwrap_or(NonZeroU32::MIN)
}

/// Waits for a pre-change analysis job to finish.
pub struct JobPoller {
    interval: Duration,
    retry_budget: NonZeroU32,
    progress: ProgressBar,
}

impl JobPoller {
    pub fn new(retry_budget: NonZeroU32) -> Self {
        Self {
            interval: POLL_INTERVAL,
            retry_budget,
            progress: ProgressBar::hidden(),
        }
    }

    /// Poller whose total wait is `minutes`, at the fixed interval.
    pub fn with_timeout_minutes(minutes: u64) -> Self {
        Self::new(retry_budget_for(Duration::from_secs(minutes.saturating_mul(60))))
    }

    /// Show a spinner on the terminal while waiting.
    pub fn with_progress(mut self, show: bool) -> Self {
        if show {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
            {
                pb.set_style(style);
            }
            self.progress = pb;
        }
        self
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget.get()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until the job completes, returning its final status record.
    pub async fn wait_for_completion<C: AssuranceApi + ?Sized>(
        &self,
        api: &C,
        session: &Session,
        insights_group: &str,
        site: &str,
        job_id: &str,
    ) -> Result<JobStatusRecord, WorkflowError> {
        let mut state = PollState::new(self.retry_budget);
        let mut attempts = 0u32;

        if !self.progress.is_hidden() {
            self.progress.enable_steady_tick(Duration::from_millis(120));
        }
        self.progress
            .set_message(format!("Waiting for pre-change analysis job {}", job_id));

        loop {
            tokio::time::sleep(self.interval).await;
            attempts += 1;

            let observed = match api.job_status(session, insights_group, site, job_id).await {
                Ok(observed) => observed,
                Err(e) => {
                    self.progress.abandon();
                    return Err(WorkflowError::StatusFetch(e));
                }
            };
            debug!("Job status is: {}", observed.analysis_status);

            state = match state.observe(observed) {
                PollState::Completed(record) => {
                    self.progress.finish_and_clear();
                    info!(
                        "Job completed. Epoch Delta JobID is {}",
                        record.epoch_delta_job_id.as_deref().unwrap_or("<none>")
                    );
                    return Ok(record);
                }
                PollState::Exhausted { last_status } => {
                    self.progress.abandon();
                    info!(
                        "Job still {} after {} checks, giving up",
                        last_status, attempts
                    );
                    return Err(WorkflowError::PollTimeout {
                        job_id: job_id.to_string(),
                        attempts,
                    });
                }
                running => {
                    if let PollState::Running {
                        retries_left,
                        ref status,
                    } = running
                    {
                        info!(
                            "Job is still not completed, current state is {}. There are {} retries left. Checking again in {}s...",
                            status,
                            retries_left,
                            self.interval.as_secs()
                        );
                        self.progress.set_message(format!(
                            "Job {} is {} ({} checks left)",
                            job_id, status, retries_left
                        ));
                    }
                    running
                }
            };
        }
    }
}
