// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runs a detection model off the async executor

use anyhow::{anyhow, Result};
use tracing::debug;

use super::{DetectionBatch, InferenceSource, ModelHandle};

/// Run `model` on `source` on the blocking thread pool.
///
/// Model failures are returned unchanged for the handler to report.
pub async fn invoke(
    model: ModelHandle,
    source: InferenceSource,
    confidence_threshold: f32,
) -> Result<DetectionBatch> {
    let batch = tokio::task::spawn_blocking(move || model.infer(&source, confidence_threshold))
        .await
        .map_err(|e| anyhow!("Inference task failed: {}", e))??;

    debug!("Inference produced {} detections", batch.detections.len());
    Ok(batch)
}
