//! Binary entrypoint for the Nearby API server.
use anyhow::Context;
use nearby_api::{run, AppState};
use nearby_core::{EngineConfig, SessionContext};
use nearby_directory::InMemoryDirectory;
use nearby_engine::{InMemoryStore, RequestController};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Defaults can be overridden with NEARBY_ADDR / NEARBY_USER_ID / NEARBY_CONFIG
    let addr = std::env::var("NEARBY_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    let user_id = std::env::var("NEARBY_USER_ID").unwrap_or_else(|_| "user-1".to_string());
    let config = match std::env::var("NEARBY_CONFIG") {
        Ok(path) => EngineConfig::load(&path)?,
        Err(_) => EngineConfig::default(),
    };

    let controller = RequestController::new(
        SessionContext::new(user_id),
        config,
        Arc::new(InMemoryStore::new()),
    )?;
    let directory = InMemoryDirectory::seeded().context("failed to load provider directory")?;

    let state = AppState::new(Arc::new(controller), Arc::new(directory))?;
    run(&addr, state).await
}
