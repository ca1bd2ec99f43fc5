//! Epoch delta aggregation.
//!
//! Collapses the severity-bucketed delta of a pre-change analysis into the
//! number of anomalies that appear only after the change, ignoring the
//! informational severity class.

use crate::error::WorkflowError;
use crate::models::DeltaBucket;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Nested outcome label for anomalies present only in the post-change epoch.
pub const NEW_IN_POST_CHANGE: &str = "EPOCH2_ONLY";

/// Top-level bucket labels containing this marker are informational.
pub const INFORMATIONAL_MARKER: &str = "INFO";

/// New-anomaly count of one top-level bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketDelta {
    pub label: String,
    /// Last `_`-separated segment of the label, e.g. `CRITICAL`.
    pub severity: String,
    pub new_count: u64,
    /// Whether this bucket contributes to the total.
    pub counted: bool,
}

/// Result of aggregating an epoch delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeltaSummary {
    pub buckets: Vec<BucketDelta>,
    /// Sum of new anomalies over non-informational buckets.
    pub total_new: u64,
}

pub fn is_informational(label: &str) -> bool {
    label.contains(INFORMATIONAL_MARKER)
}

pub fn severity_name(label: &str) -> &str {
    label.rsplit('_').next().unwrap_or(label)
}

/// Map nested outcome label to count. Later duplicates win.
pub fn outcome_counts(bucket: &DeltaBucket) -> HashMap<&str, u64> {
    bucket
        .output
        .iter()
        .map(|c| (c.bucket.as_str(), c.count))
        .collect()
}

/// Aggregate the delta buckets of a completed delta job.
///
/// Every bucket must carry a post-change-only count, informational ones
/// included; a missing count is an error rather than zero.
pub fn aggregate_delta(buckets: &[DeltaBucket]) -> Result<DeltaSummary, WorkflowError> {
    let mut summary = DeltaSummary::default();

    for bucket in buckets {
        let counts = outcome_counts(bucket);
        let new_count = counts.get(NEW_IN_POST_CHANGE).copied().ok_or_else(|| {
            WorkflowError::MalformedDelta {
                bucket: bucket.bucket.clone(),
                key: NEW_IN_POST_CHANGE.to_string(),
            }
        })?;

        let severity = severity_name(&bucket.bucket);
        info!(
            "There are {} new {} anomalies after pre-change analysis",
            new_count, severity
        );

        let counted = !is_informational(&bucket.bucket);
        if counted {
            summary.total_new = summary.total_new.saturating_add(new_count);
        }

        summary.buckets.push(BucketDelta {
            label: bucket.bucket.clone(),
            severity: severity.to_string(),
            new_count,
            counted,
        });
    }

    info!(
        "Total number of new relevant anomalies ({} excluded) is: {}",
        INFORMATIONAL_MARKER, summary.total_new
    );
    Ok(summary)
}
