//! Scripted in-memory `AssuranceApi` (testing only).
//!
//! Records every call so tests can assert which phases ran and when.

use super::{AssuranceApi, Credentials, Session};
use crate::error::ApiError;
use crate::models::{
    AnalysisJob, BucketCount, ChangeFile, DeltaBucket, Epoch, JobStatusRecord, SubmissionRecord,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Authenticate,
    LatestEpoch,
    CreateJob,
    JobStatus,
    EpochDelta,
}

pub fn status(analysis_status: &str) -> JobStatusRecord {
    JobStatusRecord {
        analysis_status: analysis_status.to_string(),
        epoch_delta_job_id: None,
    }
}

pub fn completed(delta_job_id: &str) -> JobStatusRecord {
    JobStatusRecord {
        analysis_status: "COMPLETED".to_string(),
        epoch_delta_job_id: Some(delta_job_id.to_string()),
    }
}

pub fn bucket(label: &str, baseline_only: u64, new_only: u64, both: u64) -> DeltaBucket {
    DeltaBucket {
        bucket: label.to_string(),
        output: vec![
            BucketCount {
                bucket: "EPOCH1_ONLY".to_string(),
                count: baseline_only,
            },
            BucketCount {
                bucket: "EPOCH2_ONLY".to_string(),
                count: new_only,
            },
            BucketCount {
                bucket: "BOTH_EPOCHS".to_string(),
                count: both,
            },
        ],
    }
}

pub fn sample_epoch() -> Epoch {
    Epoch {
        epoch_id: "epoch-1".to_string(),
        collection_time_msecs: 1_700_000_000_000,
        fabric_id: "fabric-1".to_string(),
    }
}

pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    status_times: Mutex<Vec<Instant>>,
    submitted: Mutex<Option<SubmissionRecord>>,
    fail_on: Option<Call>,
    epoch: Option<Epoch>,
    statuses: Mutex<VecDeque<JobStatusRecord>>,
    delta: Vec<DeltaBucket>,
}

impl FakeApi {
    /// A service on which every phase succeeds and the job completes on the first check.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status_times: Mutex::new(Vec::new()),
            submitted: Mutex::new(None),
            fail_on: None,
            epoch: Some(sample_epoch()),
            statuses: Mutex::new(VecDeque::from(vec![completed("delta-1")])),
            delta: vec![
                bucket("EVENT_SEVERITY_CRITICAL", 0, 3, 1),
                bucket("EVENT_SEVERITY_INFO", 2, 5, 7),
            ],
        }
    }

    pub fn failing_on(mut self, call: Call) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn without_epoch(mut self) -> Self {
        self.epoch = None;
        self
    }

    /// Statuses returned in order; the last one repeats forever.
    pub fn with_statuses(self, statuses: Vec<JobStatusRecord>) -> Self {
        *self.statuses.lock().unwrap() = VecDeque::from(statuses);
        self
    }

    pub fn with_delta(mut self, delta: Vec<DeltaBucket>) -> Self {
        self.delta = delta;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn status_times(&self) -> Vec<Instant> {
        self.status_times.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Option<SubmissionRecord> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(call) {
            return Err(ApiError::Status {
                status: 500,
                body: format!("{:?} rejected", call),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AssuranceApi for FakeApi {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        self.record(Call::Authenticate)?;
        Ok(Session::new(credentials.username.clone(), Some("token".to_string())))
    }

    async fn latest_epoch(
        &self,
        _session: &Session,
        _insights_group: &str,
        _site: &str,
    ) -> Result<Epoch, ApiError> {
        self.record(Call::LatestEpoch)?;
        self.epoch
            .clone()
            .ok_or_else(|| ApiError::Empty("no epochs".to_string()))
    }

    async fn create_job(
        &self,
        _session: &Session,
        _insights_group: &str,
        _site: &str,
        record: &SubmissionRecord,
        _change_file: &ChangeFile,
    ) -> Result<AnalysisJob, ApiError> {
        self.record(Call::CreateJob)?;
        *self.submitted.lock().unwrap() = Some(record.clone());
        Ok(AnalysisJob {
            job_id: "job-1".to_string(),
        })
    }

    async fn job_status(
        &self,
        _session: &Session,
        _insights_group: &str,
        _site: &str,
        _job_id: &str,
    ) -> Result<JobStatusRecord, ApiError> {
        self.status_times.lock().unwrap().push(Instant::now());
        self.record(Call::JobStatus)?;

        let mut statuses = self.statuses.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        next.ok_or_else(|| ApiError::Decode("no scripted status".to_string()))
    }

    async fn epoch_delta(
        &self,
        _session: &Session,
        _insights_group: &str,
        _site: &str,
        _epoch_delta_job_id: &str,
    ) -> Result<Vec<DeltaBucket>, ApiError> {
        self.record(Call::EpochDelta)?;
        Ok(self.delta.clone())
    }
}
