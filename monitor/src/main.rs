mod classify;
mod errors;
mod frame;
mod history;
mod ingest;
mod logstore;
mod metrics;
mod model;
mod rest;
mod state;

use axum::{routing::get, Router};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use logstore::{CsvLogStore, LogStore};
use state::SharedState;

#[tokio::main]
async fn main() {
    let sensor_source =
        env::var("SENSOR_SOURCE").unwrap_or_else(|_| "tcp://127.0.0.1:7878".to_string());
    let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
    let read_timeout_ms: u64 = env::var("READ_TIMEOUT_MS")
        .unwrap_or_else(|_| "2000".to_string())
        .parse()
        .unwrap_or(2000);

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting air quality monitor");
    info!("Sensor source: {}", sensor_source);
    info!("HTTP server: {}", http_addr);
    info!("Data directory: {}", data_dir);

    // Initialize metrics
    metrics::init_metrics();

    // Open the per-sensor log tables
    let log: Arc<dyn LogStore> = match CsvLogStore::new(&data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open log store in {}: {}", data_dir, e);
            std::process::exit(1);
        }
    };

    // The one shared state instance, handed to ingestion and query handlers
    let state = Arc::new(SharedState::new());

    // Spawn the ingestion loop. It is the sole writer; if the sensor link
    // dies the task ends and the server keeps serving last-known values.
    let ingest_state = state.clone();
    let ingest_log = log.clone();
    let read_timeout = Duration::from_millis(read_timeout_ms);
    let _ingest_handle = tokio::spawn(async move {
        ingest::run(sensor_source, read_timeout, ingest_state, ingest_log).await;
    });

    // Build HTTP app with the query API and metrics endpoint
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(state, log));

    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
