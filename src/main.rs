//! Depth Pressure - Live Order Book Feed
//!
//! Connects to a Binance depth stream, keeps the current book and its pressure
//! zones in a shared store, feeds synthetic books while the stream is down and
//! serves the state over HTTP for presentation clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use prometheus::Registry;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use depth_pressure::{
    AppState, BookMetrics, Config, FeedConnectionManager, FeedMetrics, OrderbookStore,
    StoreConfig, StoreState, SyntheticFeed, WebSocketTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting Depth Pressure feed");

    // Load configuration
    let config = Arc::new(Config::load()?);
    info!(symbol = %config.symbol, endpoint = %config.ws_endpoint, "Configuration loaded");

    let registry = Registry::new();
    let metrics = FeedMetrics::registered(&registry)?;

    let store = Arc::new(OrderbookStore::with_config(StoreConfig {
        symbol: config.symbol.clone(),
        ..StoreConfig::default()
    }));

    // Synthetic fallback runs for the whole session
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let synthetic = SyntheticFeed::from_config(store.clone(), metrics.clone(), &config);
    let synthetic_task = tokio::spawn(synthetic.run(shutdown_rx));

    // Live feed
    let transport = Arc::new(WebSocketTransport::new(config.connect_timeout()));
    let manager = FeedConnectionManager::new(store.clone(), transport, metrics, &config);
    let (feed, feed_task) = manager.spawn();

    let state = Arc::new(AppState {
        store,
        feed,
        registry,
        config: config.clone(),
    });

    // Start HTTP server
    let http_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = start_http_server(http_state).await {
            warn!(error = %e, "HTTP server error");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    if let Err(e) = state.feed.shutdown().await {
        warn!(error = %e, "Feed manager already stopped");
    }
    let _ = shutdown_tx.send(true);
    let _ = feed_task.await;
    let _ = synthetic_task.await;

    info!("Depth Pressure feed stopped");
    Ok(())
}

/// Start HTTP server for health checks, metrics and state reads
async fn start_http_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/state", get(current_state))
        .route("/symbol/:symbol", post(set_symbol))
        .route("/venues/:venue/toggle", post(toggle_venue))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.store.get_state();
    Json(serde_json::json!({
        "status": "healthy",
        "component": "depth-pressure",
        "connection_status": snapshot.connection_status.to_string(),
        "symbol": snapshot.config.symbol,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, StatusCode> {
    use prometheus::{Encoder, TextEncoder};
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Serialize)]
struct StateResponse {
    state: StoreState,
    metrics: BookMetrics,
}

async fn current_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let snapshot = state.store.get_state();
    let metrics = snapshot.metrics();
    Json(StateResponse {
        state: snapshot,
        metrics,
    })
}

async fn set_symbol(State(state): State<Arc<AppState>>, Path(symbol): Path<String>) -> StatusCode {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    info!(symbol = %symbol, "Symbol change requested");
    state.store.set_symbol(symbol);
    StatusCode::NO_CONTENT
}

async fn toggle_venue(State(state): State<Arc<AppState>>, Path(venue): Path<String>) -> StatusCode {
    state.store.toggle_venue(&venue.to_lowercase());
    StatusCode::NO_CONTENT
}
