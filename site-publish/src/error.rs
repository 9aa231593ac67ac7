//! Error types for the publish pipeline.

use thiserror::Error;

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors raised while requesting or tracking a publish job.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The backend answered with a non-success status.
    #[error("publish backend rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// HTTP layer failed (connection, timeout, etc.).
    #[error("publish backend HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A backend payload could not be parsed.
    #[error("failed to parse publish backend payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured backend URL is invalid.
    #[error("invalid publish backend URL: {0}")]
    InvalidUrl(String),

    /// No job with this id is known.
    #[error("unknown publish job: {0}")]
    UnknownJob(String),

    /// The backend response did not have the expected shape.
    #[error("unexpected publish backend response: {0}")]
    UnexpectedResponse(String),
}

impl PublishError {
    /// Returns true for transient failures worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Stable machine-readable kind of this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "publish_rejected",
            Self::Http(_) => "publish_unreachable",
            Self::Json(_) | Self::UnexpectedResponse(_) => "publish_bad_response",
            Self::InvalidUrl(_) => "publish_invalid_url",
            Self::UnknownJob(_) => "unknown_job",
        }
    }
}
