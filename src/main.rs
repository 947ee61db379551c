// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::{env, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use wastevision_detect::{
    api::{start_server, AppState},
    config::ServerConfig,
    detector::{bootstrap_default_model, ModelLoader, ModelResolver, OnnxModelLoader},
    version,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();

    info!("🚀 Starting {}", version::get_version_string());
    info!("📦 BUILD VERSION: {}", version::VERSION);

    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!(
            "Failed to create upload directory {}",
            config.upload_dir.display()
        )
    })?;

    let loader: Arc<dyn ModelLoader> = Arc::new(OnnxModelLoader::new(config.intra_threads));
    let default_model = bootstrap_default_model(loader.clone(), &config.default_model_path).await;
    let resolver = ModelResolver::new(loader, default_model);
    let state = AppState::new(resolver, config.upload_dir.clone());

    start_server(&config, state).await?;

    info!("👋 Goodbye!");
    Ok(())
}
