//! Publish backend collaborator and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use site_core::Element;
use tracing::{debug, warn};
use url::Url;

use crate::error::{PublishError, PublishResult};
use crate::job::JobReport;

/// Time limit of a single backend request unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a publish request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Site being published.
    pub website_id: String,
    /// Snapshot of the tree, as its root element.
    pub tree: Element,
    /// Optional custom domain to deploy to.
    #[serde(default)]
    pub custom_domain: Option<String>,
}

/// Backend answer to an accepted publish request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishAccepted {
    /// Id of the created job.
    pub job_id: String,
    /// Deployment location, when already known.
    #[serde(default)]
    pub deployment_url: Option<String>,
}

/// A service that deploys tree snapshots.
#[async_trait]
pub trait PublishBackend: Send + Sync {
    /// Submit a snapshot for deployment.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the request or cannot be
    /// reached. No job exists in that case.
    async fn request_publish(&self, request: &PublishRequest) -> PublishResult<PublishAccepted>;

    /// Fetch the current status of a job.
    ///
    /// # Errors
    ///
    /// Returns an error when the status could not be obtained.
    async fn job_status(&self, job_id: &str) -> PublishResult<JobReport>;
}

/// Retry with exponential backoff for idempotent backend calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with custom values.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// Single attempt, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Exponential delay before retrying after the given attempt
    /// (0-indexed), capped at `max_delay_ms`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let base_delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        base_delay.min(self.max_delay_ms as f64) as u64
    }
}

/// [`PublishBackend`] speaking JSON over HTTP.
///
/// ```text
/// POST {base}/publish             -> { jobId, deploymentUrl? }
/// GET  {base}/publish/jobs/{id}   -> { status, progress, message, deploymentUrl?, error? }
/// ```
#[derive(Debug, Clone)]
pub struct HttpPublishBackend {
    http: Client,
    base: Url,
    retry: RetryConfig,
    request_timeout: Duration,
}

impl HttpPublishBackend {
    /// Create a backend client with the default retry configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidUrl`] if the URL is malformed.
    /// Returns [`PublishError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>) -> PublishResult<Self> {
        Self::with_retry_config(base_url, RetryConfig::default())
    }

    /// Create a backend client with a custom retry configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidUrl`] if the URL is malformed or cannot
    /// carry a path.
    /// Returns [`PublishError::Http`] if the HTTP client fails to build.
    pub fn with_retry_config(base_url: impl AsRef<str>, retry: RetryConfig) -> PublishResult<Self> {
        let base = Url::parse(base_url.as_ref()).map_err(|e| PublishError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(PublishError::InvalidUrl(format!("{base} cannot carry a path")));
        }
        let http = Client::builder()
            .user_agent(concat!("site-publish/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            retry,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Limit how long a single request may take.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Per-request time limit.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Base URL requests are built from.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> PublishResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| PublishError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_status(&self, url: &Url, job_id: &str) -> PublishResult<JobReport> {
        let response = self
            .http
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PublishError::UnknownJob(job_id.to_string()));
        }
        let response = check_status(response).await?;
        let report: JobReport = response.json().await?;
        Ok(report)
    }
}

#[async_trait]
impl PublishBackend for HttpPublishBackend {
    async fn request_publish(&self, request: &PublishRequest) -> PublishResult<PublishAccepted> {
        let url = self.endpoint(&["publish"])?;
        debug!("Requesting publish of {} at {}", request.website_id, url);

        let response = self
            .http
            .post(url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        let accepted: PublishAccepted = serde_json::from_str(&body)?;
        if accepted.job_id.trim().is_empty() {
            return Err(PublishError::UnexpectedResponse("empty jobId".into()));
        }
        Ok(accepted)
    }

    async fn job_status(&self, job_id: &str) -> PublishResult<JobReport> {
        let url = self.endpoint(&["publish", "jobs", job_id])?;
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.fetch_status(&url, job_id).await {
                Ok(report) => return Ok(report),
                Err(error) if error.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        "Job status {} failed (attempt {}/{}), retrying in {}ms: {}",
                        job_id,
                        attempt + 1,
                        attempts,
                        delay,
                        error
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

async fn check_status(response: Response) -> PublishResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PublishError::Rejected {
        status: status.as_u16(),
        message: rejection_message(status, &body),
    })
}

/// `error` or `message` field of a JSON body, else the trimmed body text.
fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
