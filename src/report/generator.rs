//! Run summary rendering.
//!
//! Renders the outcome of a pre-change run as Markdown or JSON so it can be
//! attached to a change ticket or CI artifact.

use crate::analysis::BucketDelta;
use crate::cli::OutputFormat;
use crate::workflow::RunSummary;
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown summary.
pub fn generate_markdown_report(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Pre-Change Analysis: {}\n\n",
        summary.parameters.name
    ));
    output.push_str(&generate_run_section(summary));
    output.push_str(&generate_delta_section(&summary.delta.buckets));
    output.push_str(&generate_verdict(summary.anomaly_count()));

    output
}

fn generate_run_section(summary: &RunSummary) -> String {
    let mut section = String::new();
    let params = &summary.parameters;

    section.push_str("## Run\n\n");
    if !params.description.is_empty() {
        section.push_str(&format!("- **Description:** {}\n", params.description));
    }
    section.push_str(&format!("- **Insights Group:** {}\n", params.insights_group));
    section.push_str(&format!("- **Site:** {}\n", params.site));
    section.push_str(&format!(
        "- **Base Epoch:** `{}`\n",
        summary.baseline.epoch_id
    ));
    section.push_str(&format!("- **Job:** `{}`\n", summary.job_id));
    section.push_str(&format!(
        "- **Epoch Delta Job:** `{}`\n",
        summary.epoch_delta_job_id
    ));
    if params.allow_unsupported_object_modification {
        section.push_str("- **Unsupported object modifications:** allowed\n");
    }
    section.push_str(&format!(
        "- **Finished:** {}\n\n",
        summary.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    section
}

fn generate_delta_section(buckets: &[BucketDelta]) -> String {
    let mut section = String::new();

    section.push_str("## New Anomalies by Severity\n\n");
    if buckets.is_empty() {
        section.push_str("The epoch delta contained no severity buckets.\n\n");
        return section;
    }

    section.push_str("| Bucket | Severity | New | Counted |\n");
    section.push_str("|:---|:---|:---:|:---:|\n");
    for bucket in buckets {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            bucket.label,
            bucket.severity,
            bucket.new_count,
            if bucket.counted { "yes" } else { "no" }
        ));
    }
    section.push('\n');

    section
}

fn generate_verdict(total: u64) -> String {
    if total == 0 {
        "**Result:** no new relevant anomalies (informational excluded).\n".to_string()
    } else {
        format!(
            "**Result:** {} new relevant anomalies (informational excluded).\n",
            total
        )
    }
}

/// Generate a JSON summary.
pub fn generate_json_report(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

/// Render the summary in `format` and write it to `path`.
pub fn write_report(summary: &RunSummary, format: OutputFormat, path: &Path) -> Result<()> {
    let content = match format {
        OutputFormat::Json => generate_json_report(summary)?,
        OutputFormat::Markdown => generate_markdown_report(summary),
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write summary to {}", path.display()))
}
