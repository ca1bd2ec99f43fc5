//! Sequences the pre-change workflow.
//!
//! authenticate → resolve baseline → submit job → wait for completion →
//! fetch delta → aggregate. The first failing phase ends the run.

use super::baseline::resolve_baseline;
use super::poller::JobPoller;
use super::submitter::submit_job;
use crate::analysis::{aggregate_delta, DeltaSummary};
use crate::client::{AssuranceApi, Credentials};
use crate::error::{anomaly_exit_code, ApiError, WorkflowError};
use crate::models::{ChangeFile, Epoch, RunParameters};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Everything learned during a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub parameters: RunParameters,
    pub baseline: Epoch,
    pub job_id: String,
    pub epoch_delta_job_id: String,
    pub delta: DeltaSummary,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// New relevant anomalies; zero means the change is clean.
    pub fn anomaly_count(&self) -> u64 {
        self.delta.total_new
    }

    pub fn exit_code(&self) -> i32 {
        anomaly_exit_code(self.delta.total_new)
    }
}

pub struct Orchestrator<'a, C: AssuranceApi + ?Sized> {
    api: &'a C,
    poller: JobPoller,
}

impl<'a, C: AssuranceApi + ?Sized> Orchestrator<'a, C> {
    pub fn new(api: &'a C, poller: JobPoller) -> Self {
        Self { api, poller }
    }

    pub async fn run(
        &self,
        credentials: &Credentials,
        params: &RunParameters,
        change_file: &ChangeFile,
    ) -> Result<RunSummary, WorkflowError> {
        let session = self
            .api
            .authenticate(credentials)
            .await
            .map_err(WorkflowError::Auth)?;

        let baseline =
            resolve_baseline(self.api, &session, &params.insights_group, &params.site).await?;

        let job = submit_job(self.api, &session, params, &baseline, change_file).await?;

        info!(
            "Waiting up to {} checks, {}s apart, for job {}",
            self.poller.retry_budget(),
            self.poller.interval().as_secs(),
            job.job_id
        );
        let status = self
            .poller
            .wait_for_completion(
                self.api,
                &session,
                &params.insights_group,
                &params.site,
                &job.job_id,
            )
            .await?;

        let epoch_delta_job_id = status.epoch_delta_job_id.ok_or_else(|| {
            WorkflowError::StatusFetch(ApiError::Decode(format!(
                "job {} completed without an epochDeltaJobId",
                job.job_id
            )))
        })?;

        let buckets = self
            .api
            .epoch_delta(
                &session,
                &params.insights_group,
                &params.site,
                &epoch_delta_job_id,
            )
            .await
            .map_err(WorkflowError::DeltaFetch)?;

        let delta = aggregate_delta(&buckets)?;

        Ok(RunSummary {
            parameters: params.clone(),
            baseline,
            job_id: job.job_id,
            epoch_delta_job_id,
            delta,
            finished_at: Utc::now(),
        })
    }
}
