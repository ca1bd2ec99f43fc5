//! Baseline epoch selection.

use crate::client::{AssuranceApi, Session};
use crate::error::WorkflowError;
use crate::models::Epoch;
use tracing::info;

/// Resolve the latest finished online epoch of a site as the comparison baseline.
pub async fn resolve_baseline<C: AssuranceApi + ?Sized>(
    api: &C,
    session: &Session,
    insights_group: &str,
    site: &str,
) -> Result<Epoch, WorkflowError> {
    let epoch = api
        .latest_epoch(session, insights_group, site)
        .await
        .map_err(WorkflowError::Resolution)?;

    info!(
        "Selecting latest epoch as base. Base epoch uuid is: {}",
        epoch.epoch_id
    );
    Ok(epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{sample_epoch, Call, FakeApi};
    use tokio_test::{assert_err, assert_ok};

    fn session() -> Session {
        Session::new("admin", None)
    }

    #[tokio::test]
    async fn test_resolves_latest_epoch() {
        let api = FakeApi::new();
        let epoch = assert_ok!(resolve_baseline(&api, &session(), "ig1", "fab1").await);
        assert_eq!(epoch, sample_epoch());
        assert_eq!(api.calls(), vec![Call::LatestEpoch]);
    }

    #[tokio::test]
    async fn test_empty_result_is_resolution_error() {
        let api = FakeApi::new().without_epoch();
        let err = assert_err!(resolve_baseline(&api, &session(), "ig1", "fab1").await);
        assert!(matches!(err, WorkflowError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_rejected_request_is_resolution_error() {
        let api = FakeApi::new().failing_on(Call::LatestEpoch);
        let err = assert_err!(resolve_baseline(&api, &session(), "ig1", "fab1").await);
        assert_eq!(err.exit_code(), -2);
    }
}
