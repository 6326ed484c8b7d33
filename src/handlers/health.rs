//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: String,
    version: &'static str,
    model_loaded: bool,
    model: String,
    model_sha256: Option<String>,
    feature_dim: usize,
    store: &'static str,
    stored_events: Option<i64>,
    subscribers: usize,
    subscribers_removed: u64,
    timestamp: i64,
}

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
    docs: &'static str,
    health: &'static str,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    // A store outage degrades the report, it does not fail the probe
    let stored_events = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Health check could not count events: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: if stored_events.is_some() { "ok" } else { "degraded" },
        service: state.config.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        model_loaded: true,
        model: state.pipeline.classifier_name().to_string(),
        model_sha256: state.pipeline.classifier_fingerprint().map(str::to_string),
        feature_dim: state.pipeline.feature_dim(),
        store: state.store.backend(),
        stored_events,
        subscribers: state.hub.len(),
        subscribers_removed: state.hub.removed_total(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "IDS Dashboard Backend API",
        docs: "/api",
        health: "/health",
    })
}
