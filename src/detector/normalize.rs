// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Conversion of raw model detections into the API response schema

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::DetectionBatch;

/// Prefix of per-response detection identifiers
pub const DETECTION_ID_PREFIX: &str = "yolo_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("class id {0} has no name in the model's class table")]
    UnknownClass(usize),
}

/// One detection as returned to clients; `(x, y)` is the box center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
    #[serde(rename = "class")]
    pub class_name: String,
    pub class_id: usize,
    pub detection_id: String,
}

/// Body of a successful detection response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub predictions: Vec<DetectionRecord>,
}

/// Normalize one inference result.
///
/// Records keep the model's emission order and are numbered `yolo_0`,
/// `yolo_1`, ... within this response only. No filtering happens here.
pub fn normalize(batch: &DetectionBatch) -> Result<DetectionResponse, NormalizeError> {
    let mut predictions = Vec::with_capacity(batch.detections.len());

    for raw in &batch.detections {
        let class_name = batch
            .names
            .get(raw.class_id)
            .ok_or(NormalizeError::UnknownClass(raw.class_id))?;

        let (x1, y1, x2, y2) = (
            f64::from(raw.x1),
            f64::from(raw.y1),
            f64::from(raw.x2),
            f64::from(raw.y2),
        );

        predictions.push(DetectionRecord {
            x: (x1 + x2) / 2.0,
            y: (y1 + y2) / 2.0,
            width: x2 - x1,
            height: y2 - y1,
            confidence: f64::from(raw.confidence),
            class_name: class_name.to_string(),
            class_id: raw.class_id,
            detection_id: format!("{}{}", DETECTION_ID_PREFIX, predictions.len()),
        });
    }

    Ok(DetectionResponse { predictions })
}
