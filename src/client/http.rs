//! HTTPS implementation of `AssuranceApi` for Nexus Dashboard Insights.

use super::{AssuranceApi, Credentials, Session};
use crate::config::ControllerSettings;
use crate::error::ApiError;
use crate::models::{
    AnalysisJob, ApiEnvelope, ChangeFile, DeltaBucket, Epoch, JobStatusRecord, SubmissionRecord,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Path of the telemetry API below the controller base URL.
const TELEMETRY_API: [&str; 7] = ["sedgeapi", "v1", "cisco-nir", "api", "api", "telemetry", "v2"];

const LATEST_FINISHED_ONLINE_EPOCH: &str = "$size=1&$status=FINISHED&$epochType=ONLINE";

/// Staging name of the submission record part.
const SUBMISSION_PART_NAME: &str = "data.json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    user_passwd: &'a str,
    domain: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    jwttoken: Option<String>,
}

impl LoginResponse {
    fn into_token(self) -> Option<String> {
        self.token.or(self.jwttoken)
    }
}

/// Client for the analytics service. The underlying HTTP client keeps the
/// session cookies set by `/login`.
pub struct NexusClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl NexusClient {
    pub fn new(settings: &ControllerSettings) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .timeout(settings.request_timeout)
            .build()?;

        Self::with_http_client(&settings.base_url, http_client)
    }

    fn with_http_client(base_url: &str, http_client: reqwest::Client) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Base URL extended by `segments`, each one percent-encoded on its own.
    fn endpoint<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn telemetry_endpoint(&self, path: &[&str]) -> Result<Url, ApiError> {
        self.endpoint(TELEMETRY_API.iter().chain(path).copied())
    }

    fn login_url(&self) -> Result<Url, ApiError> {
        self.endpoint(["login"])
    }

    fn epochs_url(&self, insights_group: &str, site: &str) -> Result<Url, ApiError> {
        let mut url = self.telemetry_endpoint(&[
            "events",
            "insightsGroup",
            insights_group,
            "fabric",
            site,
            "epochs",
        ])?;
        url.set_query(Some(LATEST_FINISHED_ONLINE_EPOCH));
        Ok(url)
    }

    fn create_job_url(&self, insights_group: &str, site: &str) -> Result<Url, ApiError> {
        self.telemetry_endpoint(&[
            "config",
            "insightsGroup",
            insights_group,
            "fabric",
            site,
            "prechangeAnalysis",
            "fileChanges",
        ])
    }

    fn job_status_url(&self, insights_group: &str, site: &str, job_id: &str) -> Result<Url, ApiError> {
        self.telemetry_endpoint(&[
            "config",
            "insightsGroup",
            insights_group,
            "fabric",
            site,
            "prechangeAnalysis",
            job_id,
        ])
    }

    fn epoch_delta_url(
        &self,
        insights_group: &str,
        site: &str,
        delta_job_id: &str,
    ) -> Result<Url, ApiError> {
        self.telemetry_endpoint(&[
            "epochDelta",
            "insightsGroup",
            insights_group,
            "fabric",
            site,
            "job",
            delta_job_id,
            "health",
            "view",
            "eventSeverity",
        ])
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        session: &Session,
    ) -> reqwest::RequestBuilder {
        match session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        session: &Session,
        url: Url,
    ) -> Result<T, ApiError> {
        debug!("GET {}", url);
        let response = self
            .authorized(self.http_client.get(url), session)
            .send()
            .await?;
        decode_envelope(response).await
    }
}

/// Turn a non-success status into `ApiError::Status`, keeping the body for diagnostics.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> ApiError {
    ApiError::Status {
        status: status.as_u16(),
        body,
    }
}

async fn decode_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let response = ensure_success(response).await?;
    let body = response.text().await?;
    parse_envelope(&body)
}

fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: ApiEnvelope<T> = serde_json::from_str(body)?;
    Ok(envelope.into_data())
}

#[async_trait]
impl AssuranceApi for NexusClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let request = LoginRequest {
            user_name: &credentials.username,
            user_passwd: &credentials.password,
            domain: &credentials.domain,
        };

        let response = self
            .http_client
            .post(self.login_url()?)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await.unwrap_or_default();

        let token = serde_json::from_str::<LoginResponse>(&body)
            .ok()
            .and_then(LoginResponse::into_token);
        if token.is_none() {
            debug!("Login response carried no token, relying on session cookies");
        }

        info!("Authentication succeeded for user {}", credentials.username);
        Ok(Session::new(credentials.username.clone(), token))
    }

    async fn latest_epoch(
        &self,
        session: &Session,
        insights_group: &str,
        site: &str,
    ) -> Result<Epoch, ApiError> {
        let url = self.epochs_url(insights_group, site)?;
        let epochs: Vec<Epoch> = self.get_data(session, url).await?;

        epochs.into_iter().next().ok_or_else(|| {
            ApiError::Empty(format!(
                "no finished online epoch for site {} in insights group {}",
                site, insights_group
            ))
        })
    }

    async fn create_job(
        &self,
        session: &Session,
        insights_group: &str,
        site: &str,
        record: &SubmissionRecord,
        change_file: &ChangeFile,
    ) -> Result<AnalysisJob, ApiError> {
        let url = self.create_job_url(insights_group, site)?;

        let data_part = Part::bytes(serde_json::to_vec(record)?)
            .file_name(SUBMISSION_PART_NAME)
            .mime_str("application/json")?;
        let file_part = Part::bytes(change_file.content.clone())
            .file_name(change_file.file_name.clone())
            .mime_str(&change_file.mime_type)?;
        let form = Form::new().part("data", data_part).part("file", file_part);

        debug!("POST {} ({})", url, change_file.file_name);
        let response = self
            .authorized(self.http_client.post(url), session)
            .multipart(form)
            .send()
            .await?;
        decode_envelope(response).await
    }

    async fn job_status(
        &self,
        session: &Session,
        insights_group: &str,
        site: &str,
        job_id: &str,
    ) -> Result<JobStatusRecord, ApiError> {
        let url = self.job_status_url(insights_group, site, job_id)?;
        self.get_data(session, url).await
    }

    async fn epoch_delta(
        &self,
        session: &Session,
        insights_group: &str,
        site: &str,
        epoch_delta_job_id: &str,
    ) -> Result<Vec<DeltaBucket>, ApiError> {
        let url = self.epoch_delta_url(insights_group, site, epoch_delta_job_id)?;
        self.get_data(session, url).await
    }
}
