//! Pre-change analysis job submission.

use crate::client::{AssuranceApi, Session};
use crate::error::WorkflowError;
use crate::models::{AnalysisJob, ChangeFile, Epoch, RunParameters, SubmissionRecord};
use chrono::Utc;
use tracing::{debug, info};

/// Build the submission record for a run against the given baseline.
pub fn build_submission_record(
    params: &RunParameters,
    baseline: &Epoch,
    submitted_at_ms: i64,
) -> SubmissionRecord {
    SubmissionRecord {
        allow_unsupported_object_modification: params.allow_unsupported_object_modification,
        analysis_submission_time: submitted_at_ms,
        base_epoch_id: baseline.epoch_id.clone(),
        base_epoch_collection_timestamp: baseline.collection_time_msecs,
        fabric_uuid: baseline.fabric_id.clone(),
        description: params.description.clone(),
        name: params.name.clone(),
        assurance_entity_name: params.site.clone(),
        uploaded_file_name: params.name.clone(),
    }
}

/// Create the analysis job. The record is stamped with the current time.
pub async fn submit_job<C: AssuranceApi + ?Sized>(
    api: &C,
    session: &Session,
    params: &RunParameters,
    baseline: &Epoch,
    change_file: &ChangeFile,
) -> Result<AnalysisJob, WorkflowError> {
    let record = build_submission_record(params, baseline, Utc::now().timestamp_millis());
    debug!("Submission record: {:?}", record);

    let job = api
        .create_job(
            session,
            &params.insights_group,
            &params.site,
            &record,
            change_file,
        )
        .await
        .map_err(WorkflowError::Submission)?;

    info!("Pre-change analysis job created. Job id is: {}", job.job_id);
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{sample_epoch, Call, FakeApi};
    use std::path::Path;
    use tokio_test::{assert_err, assert_ok};

    fn params() -> RunParameters {
        RunParameters {
            name: "add-vlan-10".to_string(),
            description: "adds vlan 10".to_string(),
            insights_group: "ig1".to_string(),
            site: "fab1".to_string(),
            allow_unsupported_object_modification: true,
        }
    }

    #[test]
    fn test_build_submission_record() {
        let record = build_submission_record(&params(), &sample_epoch(), 1_234);

        assert!(record.allow_unsupported_object_modification);
        assert_eq!(record.analysis_submission_time, 1_234);
        assert_eq!(record.base_epoch_id, "epoch-1");
        assert_eq!(record.base_epoch_collection_timestamp, 1_700_000_000_000);
        assert_eq!(record.fabric_uuid, "fabric-1");
        assert_eq!(record.description, "adds vlan 10");
        assert_eq!(record.name, "add-vlan-10");
        assert_eq!(record.assurance_entity_name, "fab1");
        assert_eq!(record.uploaded_file_name, "add-vlan-10");
    }

    #[tokio::test]
    async fn test_submit_job_stamps_current_time() {
        let api = FakeApi::new();
        let file = ChangeFile::new(Path::new("change.json"), b"[]".to_vec());
        let before = Utc::now().timestamp_millis();

        let job = assert_ok!(
            submit_job(&api, &Session::new("admin", None), &params(), &sample_epoch(), &file).await
        );
        assert_eq!(job.job_id, "job-1");

        let submitted = api.submitted().unwrap();
        assert!(submitted.analysis_submission_time >= before);
        assert!(submitted.analysis_submission_time <= Utc::now().timestamp_millis());
    }

    #[tokio::test]
    async fn test_rejected_submission() {
        let api = FakeApi::new().failing_on(Call::CreateJob);
        let file = ChangeFile::new(Path::new("change.json"), Vec::new());

        let err = assert_err!(
            submit_job(&api, &Session::new("admin", None), &params(), &sample_epoch(), &file).await
        );
        assert!(matches!(err, WorkflowError::Submission(_)));
    }
}
