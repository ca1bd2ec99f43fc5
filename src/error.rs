//! Error types for the pre-change workflow.
//!
//! `ApiError` describes what went wrong talking to the controller;
//! `WorkflowError` says which phase it went wrong in. Every workflow
//! error is terminal and maps to its own process exit code.

use thiserror::Error;

/// Exit code for failures before the workflow starts (bad config, unreadable
/// change file, usage errors).
pub const EXIT_SETUP_FAILURE: i32 = -8;

/// Largest anomaly count reported through the exit status.
///
/// Exit statuses are truncated to 8 bits, so sentinels occupy 248..=255 and
/// counts above this value are clamped instead of wrapping back to zero.
pub const MAX_ANOMALY_EXIT_CODE: u64 = 247;

/// Failure of a single request against the analytics service.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("empty result: {0}")]
    Empty(String),

    #[error("invalid controller URL: {0}")]
    InvalidUrl(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

/// Fatal error raised by one phase of the workflow.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Authentication failed: {0}")]
    Auth(#[source] ApiError),

    #[error("Base epoch collection failed: {0}")]
    Resolution(#[source] ApiError),

    #[error("Pre-change analysis job creation failed: {0}")]
    Submission(#[source] ApiError),

    #[error("Pre-change analysis job status collection failed: {0}")]
    StatusFetch(#[source] ApiError),

    #[error("Pre-change analysis job {job_id} did not complete after {attempts} status checks")]
    PollTimeout { job_id: String, attempts: u32 },

    #[error("Epoch delta collection failed: {0}")]
    DeltaFetch(#[source] ApiError),

    #[error("Epoch delta bucket {bucket} has no {key} count")]
    MalformedDelta { bucket: String, key: String },
}

impl WorkflowError {
    /// Process exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowError::Auth(_) => -1,
            WorkflowError::Resolution(_) => -2,
            WorkflowError::Submission(_) => -3,
            WorkflowError::StatusFetch(_) => -4,
            WorkflowError::PollTimeout { .. } => -5,
            WorkflowError::DeltaFetch(_) => -6,
            WorkflowError::MalformedDelta { .. } => -7,
        }
    }
}

/// Map a computed anomaly count to an exit code.
pub fn anomaly_exit_code(count: u64) -> i32 {
    count.min(MAX_ANOMALY_EXIT_CODE) as i32
}
