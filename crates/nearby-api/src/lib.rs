//! Nearby API /v1: REST endpoints and change feed for the presentation layer
pub mod handlers;
pub mod metrics;
pub mod middleware;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use metrics::Metrics;
use nearby_directory::{ProviderDirectory, SearchHistory};
use nearby_engine::RequestController;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

/// Searches shown by `GET /v1/search/history`
pub const HISTORY_LIMIT: usize = 5;

pub struct AppState {
    pub controller: Arc<RequestController>,
    pub directory: Arc<dyn ProviderDirectory>,
    pub history: Mutex<SearchHistory>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Must be called inside a tokio runtime: the metrics feed is spawned here.
    pub fn new(
        controller: Arc<RequestController>,
        directory: Arc<dyn ProviderDirectory>,
    ) -> anyhow::Result<Arc<Self>> {
        let metrics = Arc::new(Metrics::new().context("failed to register metrics")?);
        crate::metrics::spawn_feed(metrics.clone(), controller.subscribe());

        Ok(Arc::new(Self {
            controller,
            directory,
            history: Mutex::new(SearchHistory::new()),
            metrics,
        }))
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health))
        .route("/v1/search", get(handlers::search))
        .route("/v1/search/history", get(handlers::search_history))
        .route("/v1/requests", post(handlers::create_request))
        .route(
            "/v1/requests/active",
            get(handlers::active_request).delete(handlers::cancel_request),
        )
        .route("/v1/requests/active/refresh", post(handlers::refresh_request))
        .route("/v1/events", get(handlers::events))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Nearby API listening on {}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
