//! Publish job state and the rules for applying backend reports to it.

use serde::{Deserialize, Serialize};
use site_core::schema::current_timestamp_ms;

/// Lifecycle state of a publish job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Nothing published yet.
    #[default]
    Idle,
    /// Accepted by the backend and being built.
    Publishing,
    /// Deployed.
    Completed,
    /// Deployment failed.
    Failed,
}

impl JobStatus {
    /// True for `completed` and `failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Lowercase name as used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Publishing => "publishing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Map a backend status string onto a local status.
    ///
    /// Only the two terminal names end a job. Anything else (`idle`,
    /// `queued`, names we do not know) keeps it publishing.
    #[must_use]
    pub fn from_remote(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Publishing,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status report from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    /// Backend status name.
    pub status: String,
    /// Reported progress percentage.
    #[serde(default)]
    pub progress: Option<u64>,
    /// Human readable progress message.
    #[serde(default)]
    pub message: Option<String>,
    /// Deployment location, once known.
    #[serde(default)]
    pub deployment_url: Option<String>,
    /// Failure detail for failed jobs.
    #[serde(default)]
    pub error: Option<String>,
}

impl JobReport {
    /// Report with a status and progress only.
    #[must_use]
    pub fn new(status: impl Into<String>, progress: u64) -> Self {
        Self {
            status: status.into(),
            progress: Some(progress),
            ..Self::default()
        }
    }

    /// Set the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the deployment URL.
    #[must_use]
    pub fn with_deployment_url(mut self, url: impl Into<String>) -> Self {
        self.deployment_url = Some(url.into());
        self
    }

    /// Set the error detail.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Observable state of one publish job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishJob {
    /// Backend job id.
    pub job_id: String,
    /// Site being published.
    pub website_id: String,
    /// Current state.
    pub status: JobStatus,
    /// Displayed progress, 0-100. Never decreases while publishing.
    pub progress: u8,
    /// Latest progress message.
    pub message: String,
    /// Deployment location, once reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    /// Failure detail; only set when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when polling stopped at the ceiling before a terminal report.
    #[serde(default)]
    pub timed_out: bool,
    /// Milliseconds since the Unix epoch when the job was accepted.
    pub started_at: u64,
}

impl PublishJob {
    /// A job the backend has just accepted.
    #[must_use]
    pub fn accepted(
        job_id: impl Into<String>,
        website_id: impl Into<String>,
        deployment_url: Option<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            website_id: website_id.into(),
            status: JobStatus::Publishing,
            progress: 0,
            message: "Publishing".to_string(),
            deployment_url,
            error: None,
            timed_out: false,
            started_at: current_timestamp_ms(),
        }
    }

    /// True once the job has completed or failed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True when nothing more will be observed for this job.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.is_terminal() || self.timed_out
    }

    /// Apply a backend report. Returns whether anything changed.
    ///
    /// Terminal jobs ignore every later report.
    pub fn apply(&mut self, report: &JobReport) -> bool {
        if self.is_terminal() {
            return false;
        }
        let before = self.clone();

        let status = JobStatus::from_remote(&report.status);
        if let Some(progress) = report.progress {
            let progress = u8::try_from(progress.min(100)).unwrap_or(100);
            self.progress = self.progress.max(progress);
        }
        if let Some(message) = &report.message {
            self.message.clone_from(message);
        }
        if report.deployment_url.is_some() {
            self.deployment_url.clone_from(&report.deployment_url);
        }
        match status {
            JobStatus::Completed => {
                self.status = JobStatus::Completed;
                self.progress = 100;
            }
            JobStatus::Failed => {
                self.status = JobStatus::Failed;
                self.error = Some(
                    report
                        .error
                        .clone()
                        .or_else(|| report.message.clone())
                        .unwrap_or_else(|| "publish failed".to_string()),
                );
            }
            JobStatus::Idle | JobStatus::Publishing => {}
        }

        *self != before
    }

    /// Fail the job locally. No-op on terminal jobs.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        let error = error.into();
        self.status = JobStatus::Failed;
        self.message.clone_from(&error);
        self.error = Some(error);
        true
    }

    /// Flag that polling gave up before a terminal report.
    pub fn mark_timed_out(&mut self) -> bool {
        if self.is_terminal() || self.timed_out {
            return false;
        }
        self.timed_out = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> PublishJob {
        PublishJob::accepted("job-1", "site-1", None)
    }

    #[test]
    fn test_accepted_job_is_publishing() {
        let job = job();
        assert_eq!(job.status, JobStatus::Publishing);
        assert_eq!(job.progress, 0);
        assert!(!job.is_settled());
    }

    #[test]
    fn test_progress_never_regresses() {
        let mut job = job();
        assert!(job.apply(&JobReport::new("publishing", 60)));
        assert!(!job.apply(&JobReport::new("publishing", 40)));
        assert_eq!(job.progress, 60);
        job.apply(&JobReport::new("publishing", 250));
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_url_kept_when_absent() {
        let mut job = job();
        job.apply(&JobReport::new("publishing", 10).with_deployment_url("https://a.example.com"));
        job.apply(&JobReport::new("publishing", 20).with_message("Uploading"));
        assert_eq!(job.deployment_url.as_deref(), Some("https://a.example.com"));
        assert_eq!(job.message, "Uploading");
    }

    #[test]
    fn test_non_terminal_remote_statuses_keep_publishing() {
        let mut job = job();
        for status in ["idle", "queued", "building", "QUEUED"] {
            job.apply(&JobReport::new(status, 5));
            assert_eq!(job.status, JobStatus::Publishing, "{status}");
        }
    }

    #[test]
    fn test_completed_is_final() {
        let mut job = job();
        job.apply(
            &JobReport::new("completed", 100)
                .with_message("Live")
                .with_deployment_url("https://site-1.example.com"),
        );
        let done = job.clone();
        assert!(!job.apply(&JobReport::new("failed", 0).with_error("late")));
        assert!(!job.fail("later"));
        assert!(!job.mark_timed_out());
        assert_eq!(job, done);
    }

    #[test]
    fn test_failed_stores_error_or_message() {
        let mut job = job();
        job.apply(&JobReport::new("failed", 40).with_message("Build broke"));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("Build broke"));
        assert_eq!(job.progress, 40);

        let mut job = PublishJob::accepted("job-2", "site-1", None);
        job.apply(&JobReport::new("failed", 0).with_error("quota exceeded"));
        assert_eq!(job.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_timed_out_keeps_status() {
        let mut job = job();
        job.apply(&JobReport::new("publishing", 70));
        assert!(job.mark_timed_out());
        assert!(!job.mark_timed_out());
        assert_eq!(job.status, JobStatus::Publishing);
        assert_eq!(job.progress, 70);
        assert!(job.is_settled());
    }

    #[test]
    fn test_wire_shape() {
        let mut job = job();
        job.apply(&JobReport::new("publishing", 30).with_message("Building"));
        let value = serde_json::to_value(&job).expect("serialize");
        assert_eq!(value["jobId"], "job-1");
        assert_eq!(value["status"], "publishing");
        assert_eq!(value["timedOut"], false);
        assert!(value.get("deploymentUrl").is_none());

        let report: JobReport = serde_json::from_str(
            r#"{"status":"completed","progress":100,"deploymentUrl":"https://x.example.com"}"#,
        )
        .expect("report");
        assert_eq!(report.deployment_url.as_deref(), Some("https://x.example.com"));
        assert_eq!(report.message, None);
    }
}
