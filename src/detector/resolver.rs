// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model handle resolution
//!
//! Two lifecycles live side by side:
//! - the default handle, loaded once at startup and shared by `/detect-file`
//! - per-request handles, loaded from a client path on every `/detect` call
//!   and dropped afterwards. Nothing is cached.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::{ModelHandle, ModelLoader};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model_path form field is required")]
    MissingPath,

    #[error("Model file not found at path: {0}")]
    NotFound(String),

    #[error("Failed to load model '{path}': {message}")]
    Load { path: String, message: String },

    #[error("Default model not loaded")]
    Unavailable,
}

/// Hands out model handles to request handlers
pub struct ModelResolver {
    loader: Arc<dyn ModelLoader>,
    default_model: Option<ModelHandle>,
}

impl ModelResolver {
    pub fn new(loader: Arc<dyn ModelLoader>, default_model: Option<ModelHandle>) -> Self {
        Self {
            loader,
            default_model,
        }
    }

    /// Load a fresh model from a client-supplied path.
    ///
    /// The existence check runs before the loader is touched, so a bad path
    /// never triggers a load.
    pub async fn resolve_by_path(
        &self,
        model_path: Option<&str>,
    ) -> Result<ModelHandle, ModelError> {
        let model_path = match model_path {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err(ModelError::MissingPath),
        };

        let path = PathBuf::from(&model_path);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ModelError::NotFound(model_path));
        }

        let loader = self.loader.clone();
        let load_path = path.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load(&load_path))
            .await
            .map_err(|e| ModelError::Load {
                path: model_path.clone(),
                message: e.to_string(),
            })?;

        match loaded {
            Ok(model) => {
                info!("Using model for this request: {}", model_path);
                Ok(model)
            }
            Err(e) => {
                warn!("Error loading model from path {}: {:#}", model_path, e);
                Err(ModelError::Load {
                    path: model_path,
                    message: format!("{:#}", e),
                })
            }
        }
    }

    /// The model loaded at startup
    pub fn default_model(&self) -> Result<ModelHandle, ModelError> {
        self.default_model.clone().ok_or(ModelError::Unavailable)
    }

    pub fn has_default_model(&self) -> bool {
        self.default_model.is_some()
    }
}

/// Load the startup model.
///
/// Never fails: a missing file or a load error is logged and yields `None`,
/// leaving the service up with `/detect-file` reporting the model as
/// unavailable.
pub async fn bootstrap_default_model(
    loader: Arc<dyn ModelLoader>,
    model_path: &Path,
) -> Option<ModelHandle> {
    if !model_path.exists() {
        if let Some(parent) = model_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Could not create model directory {}: {}", parent.display(), e);
            }
        }
        warn!(
            "Default model path {} not found. Please ensure the model file exists.",
            model_path.display()
        );
        return None;
    }

    let path = model_path.to_path_buf();
    let loaded = tokio::task::spawn_blocking(move || loader.load(&path)).await;

    match loaded {
        Ok(Ok(model)) => {
            info!("✅ Default YOLO model loaded from {}", model_path.display());
            Some(model)
        }
        Ok(Err(e)) => {
            warn!("⚠️ Error loading default model: {:#}", e);
            None
        }
        Err(e) => {
            warn!("⚠️ Default model load task failed: {}", e);
            None
        }
    }
}
