//! Prometheus metrics for site-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const HTTP_REQUESTS_TOTAL: &str = "site_http_requests_total";
const HTTP_REQUEST_DURATION: &str = "site_http_request_duration_seconds";
const TREE_MUTATIONS_TOTAL: &str = "site_tree_mutations_total";
const RENDERS_TOTAL: &str = "site_renders_total";
const UNKNOWN_COMPONENTS_TOTAL: &str = "site_unknown_components_total";
const PUBLISH_REQUESTS_TOTAL: &str = "site_publish_requests_total";
const PUBLISH_ACTIVE_POLLS: &str = "site_publish_active_polls";
const VALIDATION_FAILURES_TOTAL: &str = "site_validation_failures_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record an HTTP request.
///
/// # Arguments
///
/// * `method` - HTTP method (GET, POST, etc.)
/// * `path` - Matched route template
/// * `status` - HTTP status code
/// * `duration_secs` - Request duration in seconds
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        HTTP_REQUEST_DURATION,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// Middleware timing every request against its route template.
pub async fn track_http(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let response = next.run(request).await;
    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Record a tree mutation made through the API.
///
/// # Arguments
///
/// * `op` - Operation name (update_props, insert_child, ...)
/// * `success` - Whether the mutation was applied
pub fn record_tree_mutation(op: &str, success: bool) {
    counter!(
        TREE_MUTATIONS_TOTAL,
        "op" => op.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record a render pass and any unknown-component placeholders it produced.
pub fn record_render(viewport: &str, mode: &str, unknown_components: usize) {
    counter!(
        RENDERS_TOTAL,
        "viewport" => viewport.to_string(),
        "mode" => mode.to_string()
    )
    .increment(1);
    if unknown_components > 0 {
        counter!(UNKNOWN_COMPONENTS_TOTAL)
            .increment(u64::try_from(unknown_components).unwrap_or(u64::MAX));
    }
}

/// Record a publish request.
///
/// # Arguments
///
/// * `outcome` - "accepted", "rejected" or "unavailable"
pub fn record_publish_request(outcome: &str) {
    counter!(
        PUBLISH_REQUESTS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Update the number of running publish poll loops.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_polls(count: usize) {
    gauge!(PUBLISH_ACTIVE_POLLS).set(count as f64);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (site_id, element_id, ...)
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_tree_mutation("insert_child", true);
        record_render("mobile", "editor", 2);
        record_publish_request("accepted");
        set_active_polls(3);
        record_validation_failure("site_id");
    }

    #[test]
    fn test_local_recorder_renders() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || record_publish_request("rejected"));
        let text = handle.render();
        assert!(text.contains(PUBLISH_REQUESTS_TOTAL));
        assert!(text.contains("outcome=\"rejected\""));
    }
}
