//! chatrelay - a streaming chat relay for browser widgets
//!
//! Browser chat widgets can't hold an LLM provider credential, so they post their conversation
//! here instead. The relay checks the caller's origin, trims the conversation to a recent window,
//! attaches the server-held key, and streams the provider's event stream straight back, stopping
//! once a byte cap is passed.

use axum::Router;
use axum::routing::any;
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod client;
pub mod cors;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod relay;
pub mod settings;

use client::{HttpClient, HyperClient, PoolConfig};
use handlers::chat_handler;
use settings::Settings;

/// The application state: the upstream client and the settings it runs with
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub settings: Arc<Settings>,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(settings: Settings) -> Self {
        Self::with_client(settings, client::create_hyper_client(PoolConfig::default()))
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(settings: Settings, http_client: T) -> Self {
        Self {
            http_client,
            settings: Arc::new(settings),
        }
    }
}

/// Build the router for the relay.
///
/// Every method on the configured path goes to [`chat_handler`], which does its own method
/// gating so that rejected methods still carry CORS headers.
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router for {}", state.settings.path);
    Router::new()
        .route(&state.settings.path, any(chat_handler))
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// Response body sizes are recorded, so capped relays show up as a cluster just over the cap.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}
