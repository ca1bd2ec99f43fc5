//! Data models for the pre-change workflow.
//!
//! Wire types mirror the JSON the analytics service speaks (camelCase);
//! the rest are the inputs and outputs passed between workflow phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Analysis status reported by the service once a job has finished.
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// Envelope every analytics endpoint wraps its payload in: `{"value": {"data": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub value: ApiValue<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiValue<T> {
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    pub fn into_data(self) -> T {
        self.value.data
    }
}

/// A finished snapshot of fabric state used as the comparison baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub epoch_id: String,
    pub collection_time_msecs: i64,
    pub fabric_id: String,
}

/// Record uploaded as the `data` part when creating an analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub allow_unsupported_object_modification: bool,
    /// Wall-clock submission time, milliseconds since the Unix epoch.
    pub analysis_submission_time: i64,
    pub base_epoch_id: String,
    pub base_epoch_collection_timestamp: i64,
    pub fabric_uuid: String,
    pub description: String,
    pub name: String,
    pub assurance_entity_name: String,
    pub uploaded_file_name: String,
}

/// Identifier of a created pre-change analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub job_id: String,
}

/// One observation of a job's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRecord {
    pub analysis_status: String,
    /// Present once the job has completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_delta_job_id: Option<String>,
}

impl JobStatusRecord {
    /// Every status other than `COMPLETED` (failures included) means "keep waiting".
    pub fn is_completed(&self) -> bool {
        self.analysis_status == STATUS_COMPLETED
    }
}

/// Count for one comparison outcome inside a delta bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub bucket: String,
    pub count: u64,
}

/// Severity/category bucket of the epoch delta with its per-outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaBucket {
    pub bucket: String,
    #[serde(default)]
    pub output: Vec<BucketCount>,
}

/// Parameters of a single pre-change run, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunParameters {
    pub name: String,
    pub description: String,
    pub insights_group: String,
    pub site: String,
    pub allow_unsupported_object_modification: bool,
}

/// Change definition uploaded next to the submission record.
#[derive(Clone, PartialEq, Eq)]
pub struct ChangeFile {
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl ChangeFile {
    /// Build from a path and its already-read content.
    pub fn new(path: &Path, content: Vec<u8>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "changes".to_string());
        let mime_type = guess_mime_type(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            content,
        }
    }
}

impl fmt::Debug for ChangeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.content.len())
            .finish()
    }
}

/// MIME type for a change file, based on its extension.
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "txt" | "cfg" | "conf" => "text/plain",
        "yaml" | "yml" => "application/yaml",
        _ => "application/octet-stream",
    }
}
