//! # Saorsa Site Server Library
//!
//! HTTP surface of the site builder: tree editing, rendering, previews and
//! publishing. Used by the `saorsa-site` binary and the integration tests.
//!
//! ```text
//! HTTP ──▶ routes ──▶ TreeStore (site-core)
//!            │  └───▶ Renderer / export_page (site-renderer)
//!            └──────▶ Publisher ──▶ backend (site-publish)
//!                        └── watch ──▶ SSE events
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use site_core::{ComponentRegistry, TreeStore};
use site_publish::Publisher;

pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Trees of all sites.
    pub store: TreeStore,
    /// Component types known to the editor.
    pub registry: Arc<ComponentRegistry>,
    /// Publish coordination; `None` when no backend is configured.
    pub publisher: Option<Publisher>,
    /// Prometheus handle backing `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State over a store with the built-in registry and no publisher.
    #[must_use]
    pub fn new(store: TreeStore) -> Self {
        Self {
            store,
            registry: Arc::new(ComponentRegistry::with_builtins()),
            publisher: None,
            metrics: None,
        }
    }

    /// Use a custom component registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Enable publishing.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Publisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Serve metrics from this handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the application router (health, metrics and API routes).
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/components", get(routes::list_components))
        .route("/sites", get(routes::list_sites))
        .route(
            "/sites/{site}",
            post(routes::create_site).delete(routes::delete_site),
        )
        .route("/sites/{site}/tree", get(routes::get_tree).put(routes::put_tree))
        .route(
            "/sites/{site}/elements/{id}",
            axum::routing::patch(routes::update_element).delete(routes::remove_element),
        )
        .route("/sites/{site}/elements/{id}/children", post(routes::insert_child))
        .route("/sites/{site}/elements/{id}/move", post(routes::move_element))
        .route("/sites/{site}/render", get(routes::render))
        .route("/sites/{site}/preview", get(routes::preview))
        .route(
            "/sites/{site}/publish",
            post(routes::start_publish)
                .get(routes::publish_status)
                .delete(routes::cancel_publish),
        )
        .route("/sites/{site}/publish/events", get(events::publish_events))
        .layer(DefaultBodyLimit::max(validation::MAX_BODY_SIZE));

    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .route_layer(middleware::from_fn(metrics::track_http))
        .with_state(state)
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "metrics", skip(state))]
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let Some(handle) = &state.metrics else {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    };
    if let Some(publisher) = &state.publisher {
        metrics::set_active_polls(publisher.active_polls());
    }
    handle.render().into_response()
}
