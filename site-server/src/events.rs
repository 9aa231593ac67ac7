//! Publish progress streaming via Server-Sent Events.
//!
//! `GET /api/sites/{site}/publish/events` streams the latest job snapshot,
//! then every change, and ends when the job's poll loop stops:
//!
//! ```text
//! event: publish_job
//! data: {"jobId":"job-42","status":"publishing","progress":30,...}
//! ```

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use site_publish::PublishJob;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

use crate::error::{ApiError, ApiResult};
use crate::validation::validate_site_id;
use crate::AppState;

/// SSE event name for job snapshots.
pub const PUBLISH_JOB_EVENT: &str = "publish_job";

/// Encode one job snapshot as an SSE event.
#[must_use]
pub fn job_event(job: &PublishJob) -> Event {
    let data = serde_json::to_string(job).unwrap_or_default();
    Event::default()
        .event(PUBLISH_JOB_EVENT)
        .id(format!("{}:{}", job.job_id, job.progress))
        .data(data)
}

/// SSE stream of a site's publish job.
///
/// # Example
///
/// ```text
/// curl -N http://localhost:9474/api/sites/site-1/publish/events
/// ```
pub async fn publish_events(
    State(state): State<AppState>,
    Path(site): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    validate_site_id(&site)?;
    let publisher = state.publisher.as_ref().ok_or(ApiError::PublishUnavailable)?;
    let rx = publisher.subscribe(&site).ok_or(ApiError::NoJob(site))?;

    let stream = WatchStream::new(rx).map(|job| Ok(job_event(&job)));
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("heartbeat"),
    ))
}
