use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{aggregator::Aggregator, config::Config, render::render_page, sources::SourceKey};

const UNAVAILABLE_PAGE: &str = "<!DOCTYPE html>\n<html><body><h1>Service temporarily unavailable</h1></body></html>\n";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Arc<Aggregator>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub sources: Vec<SourceStatus>,
}

#[derive(Debug, Serialize)]
pub struct SourceStatus {
    pub source: SourceKey,
    pub fetched_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Html<&'static str>)> {
    match state.aggregator.build_view().await {
        Ok(view) => Ok(Html(render_page(
            &view,
            &state.config.transit_label,
            state.config.page_refresh_secs,
        ))),
        Err(e) => {
            tracing::error!("Dashboard unavailable: {:#}", anyhow::Error::new(e));
            Err((StatusCode::INTERNAL_SERVER_ERROR, Html(UNAVAILABLE_PAGE)))
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let sources = state
        .aggregator
        .cache_status()
        .await
        .into_iter()
        .map(|(source, fetched_at)| SourceStatus { source, fetched_at })
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sources,
    })
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .with_state(state)
}
