//! IDS Dashboard Backend
//!
//! Ingests network-traffic feature vectors, classifies them, stores the
//! result and fans it out live, and answers trailing-window stats.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    IDS BACKEND                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  POST /api/ingest                                           │
//! │        │                                                    │
//! │        ▼                                                    │
//! │  ┌───────────┐  ┌────────────┐  ┌────────────┐  ┌────────┐ │
//! │  │ validate  │─▶│ Classifier │─▶│ EventStore │─▶│  Hub   │─┼─▶ /api/ws/events
//! │  └───────────┘  └────────────┘  └─────┬──────┘  └────────┘ │
//! │                                       │                     │
//! │  GET /api/events ◀────────────────────┤                     │
//! │  GET /api/stats  ◀── WindowAggregator ┘                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod models;
pub mod pipeline;
pub mod store;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    http::HeaderValue,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use aggregator::WindowAggregator;
use config::Config;
use hub::BroadcastHub;
use pipeline::IngestionPipeline;
use store::EventStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub store: Arc<dyn EventStore>,
    pub aggregator: Arc<WindowAggregator>,
    pub hub: Arc<BroadcastHub>,
    pub config: Config,
}

impl AppState {
    /// Wire the core components around one store, classifier and hub.
    pub fn new(
        config: Config,
        store: Arc<dyn EventStore>,
        classifier: Arc<dyn classifier::Classifier>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        let pipeline = IngestionPipeline::new(
            classifier,
            Arc::clone(&store),
            Arc::clone(&hub),
            config.feature_dim,
        );

        Self {
            pipeline: Arc::new(pipeline),
            aggregator: Arc::new(WindowAggregator::new(Arc::clone(&store))),
            store,
            hub,
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/ingest", post(handlers::events::ingest))
        .route("/events", get(handlers::events::list))
        .route("/stats", get(handlers::stats::get))
        .route("/ws/events", get(handlers::stream::events));

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}
