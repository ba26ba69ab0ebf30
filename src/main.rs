mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, StoreBackend};
use crate::db::{create_pool, run_migrations};
use crate::services::classifier::ContentClassifier;
use crate::services::store::{CatalogStore, MemoryCatalogStore, PgCatalogStore};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CatalogStore>,
    pub classifier: Arc<ContentClassifier>,
    pub start_time: Instant,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iptv_catalog_sync=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting IPTV Catalog Sync v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.node_env);

    let store: Arc<dyn CatalogStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config).await?;
            run_migrations(&pool).await?;
            Arc::new(PgCatalogStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory catalog store; data is lost on restart");
            Arc::new(MemoryCatalogStore::new())
        }
    };

    // Build application state
    let state = Arc::new(AppState {
        config,
        store,
        classifier: Arc::new(ContentClassifier::default()),
        start_time: Instant::now(),
    });

    // Build router
    let app = Router::new()
        // Health endpoints
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/ready", get(routes::health::ready))
        .route("/live", get(routes::health::live))
        // Sync endpoints
        .route("/api/sync/all", post(routes::sync::sync_all))
        .route(
            "/api/sync/category/:category",
            post(routes::sync::sync_category),
        )
        .route("/api/sync/epg", post(routes::sync::sync_epg))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
