// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::detect::detect_handler;
use super::detect_file::detect_file_handler;
use super::handlers::health_handler;
use crate::config::ServerConfig;
use crate::detector::ModelResolver;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ModelResolver>,
    /// Directory `/detect-file` persists uploads into
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(resolver: ModelResolver, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver: Arc::new(resolver),
            upload_dir: upload_dir.into(),
        }
    }
}

pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/detect", post(detect_handler))
        .route("/detect-file", post(detect_file_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state, config.max_upload_bytes);
    let listener = TcpListener::bind(config.listen_addr).await?;

    info!("Detection API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutting down...");
    }
}
