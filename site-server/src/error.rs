//! HTTP error responses.
//!
//! Every failure leaves the server as `{ "error": message, "code": kind }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use site_core::{CoreError, StoreError};
use site_publish::PublishError;
use thiserror::Error;

use crate::metrics;
use crate::validation::ValidationError;

/// Result type for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Untrusted input was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A tree operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// The tree store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The publish backend failed or rejected the request.
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// No publish backend is configured.
    #[error("publishing is not configured")]
    PublishUnavailable,
    /// Nothing is being published for the site.
    #[error("no publish job for site {0}")]
    NoJob(String),
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub error: String,
    /// Machine-readable kind.
    pub code: &'static str,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Core(e) | Self::Store(StoreError::Tree(e)) => core_status(e),
            Self::Store(StoreError::SiteNotFound(_)) | Self::NoJob(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Publish(PublishError::UnknownJob(_)) => StatusCode::NOT_FOUND,
            Self::Publish(_) => StatusCode::BAD_GATEWAY,
            Self::PublishUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable kind for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Core(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Publish(e) => e.code(),
            Self::PublishUnavailable => "publish_unavailable",
            Self::NoJob(_) => "no_publish_job",
        }
    }
}

fn core_status(error: &CoreError) -> StatusCode {
    match error {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::UnknownViewport(_) | CoreError::Serialization(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Validation(e) = &self {
            metrics::record_validation_failure(e.kind());
        }
        if status.is_server_error() {
            tracing::warn!("Request failed ({}): {}", status, self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
