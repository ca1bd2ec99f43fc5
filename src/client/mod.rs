//! Remote analytics service client.
//!
//! `AssuranceApi` is the request/response surface the workflow depends on.
//! `NexusClient` implements it over HTTPS; tests use the scripted fake.

mod http;

#[cfg(test)]
pub mod fake;

pub use http::NexusClient;

use crate::error::ApiError;
use crate::models::{
    AnalysisJob, ChangeFile, DeltaBucket, Epoch, JobStatusRecord, SubmissionRecord,
};
use async_trait::async_trait;
use std::fmt;

/// Login credentials for the controller.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Authenticated context obtained once per run.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    token: Option<String>,
}

impl Session {
    pub fn new(user: impl Into<String>, token: Option<String>) -> Self {
        Self {
            user: user.into(),
            token,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Typed operations against the network-assurance analytics service.
///
/// Every method fails on any non-success response; callers never retry.
#[async_trait]
pub trait AssuranceApi: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ApiError>;

    /// Most recent finished, online epoch for the site (service returns at most one).
    async fn latest_epoch(
        &self,
        session: &Session,
        insights_group: &str,
        site: &str,
    ) -> Result<Epoch, ApiError>;

    async fn create_job(
        &self,
        session: &Session,
        insights_group: &str,
        site: &str,
        record: &SubmissionRecord,
        change_file: &ChangeFile,
    ) -> Result<AnalysisJob, ApiError>;

    async fn job_status(
        &self,
        session: &Session,
        insights_group: &str,
        site: &str,
        job_id: &str,
    ) -> Result<JobStatusRecord, ApiError>;

    async fn epoch_delta(
        &self,
        session: &Session,
        insights_group: &str,
        site: &str,
        epoch_delta_job_id: &str,
    ) -> Result<Vec<DeltaBucket>, ApiError>;
}
