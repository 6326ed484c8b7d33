//! IDS Dashboard Backend Server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ids_backend::{
    classifier::StandardScoreDetector,
    config::Config,
    create_router, db,
    hub::BroadcastHub,
    store::{EventStore, MemoryEventStore, PgEventStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    init_tracing(config.json_logs);

    tracing::info!("{} starting...", config.app_name);

    // Load scoring artifact once; immutable afterwards
    let detector = StandardScoreDetector::load(&config.model_path)
        .with_context(|| format!("Failed to load model from {}", config.model_path))?;
    if detector.dimension() != config.feature_dim {
        bail!(
            "Model expects {} features but FEATURE_DIM is {}",
            detector.dimension(),
            config.feature_dim
        );
    }

    let store = open_store(&config).await?;
    tracing::info!("Event store: {}", store.backend());

    let hub = Arc::new(BroadcastHub::new(config.subscriber_buffer));
    let state = AppState::new(config.clone(), store, Arc::new(detector), Arc::clone(&hub));

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ids_backend=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn EventStore>> {
    if config.uses_memory_store() {
        tracing::warn!("Using in-memory event store, events are lost on restart");
        return Ok(Arc::new(MemoryEventStore::new()));
    }

    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(Arc::new(PgEventStore::new(pool)))
}

/// Resolves on Ctrl-C / SIGTERM; closes the hub so live streams end.
async fn shutdown_signal(hub: Arc<BroadcastHub>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    hub.close_all();
}
