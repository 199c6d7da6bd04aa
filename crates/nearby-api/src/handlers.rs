//! API Handlers
use crate::{AppState, HISTORY_LIMIT};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, Stream};
use nearby_core::{NearbyError, Request};
use nearby_directory::{find_providers, SearchHistoryEntry, SearchOutcome};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, PoisonError};
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;

static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

/// Errors returned as `{ "error": "..." }`
#[derive(Debug)]
pub enum ApiError {
    Engine(NearbyError),
    NoProviders(String),
    Internal(String),
}

impl From<NearbyError> for ApiError {
    fn from(err: NearbyError) -> Self {
        ApiError::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Engine(err) => {
                let status = match err {
                    NearbyError::Validation(_) => StatusCode::BAD_REQUEST,
                    NearbyError::NoActiveRequest => StatusCode::CONFLICT,
                    NearbyError::Persistence(_) | NearbyError::Directory(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::NoProviders(query) => (
                StatusCode::NOT_FOUND,
                format!("no providers found for \"{}\"", query),
            ),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub query: String,
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": STARTED.elapsed().as_secs(),
        })),
    )
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let outcome = find_providers(state.directory.as_ref(), &params.q).await?;
    state
        .history
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record(outcome.query.clone(), outcome.kind);
    Ok(Json(outcome))
}

pub async fn search_history(State(state): State<Arc<AppState>>) -> Json<Vec<SearchHistoryEntry>> {
    let history = state.history.lock().unwrap_or_else(PoisonError::into_inner);
    Json(history.recent(HISTORY_LIMIT))
}

pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<Request>), ApiError> {
    let outcome = find_providers(state.directory.as_ref(), &body.query).await?;
    if outcome.providers.is_empty() {
        return Err(ApiError::NoProviders(outcome.query));
    }

    let request = state
        .controller
        .create(&outcome.query, outcome.kind, &outcome.providers)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// The held request, or `null` before the first one is created
pub async fn active_request(State(state): State<Arc<AppState>>) -> Json<Option<Request>> {
    Json(state.controller.observe())
}

pub async fn cancel_request(State(state): State<Arc<AppState>>) -> Result<Json<Request>, ApiError> {
    Ok(Json(state.controller.cancel().await?))
}

pub async fn refresh_request(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<Request>>, ApiError> {
    Ok(Json(state.controller.refresh().await?))
}

/// Server-sent change feed; one `event:` per `RequestEvent`, named after it.
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let receiver = state.controller.subscribe();

    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let sse = Event::default().event(event.name()).json_data(&event);
                    return Some((sse, receiver));
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}
