// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection: model seam, resolution, invocation and normalization
//!
//! Components:
//! - `resolver` - default and per-request model handles
//! - `invoke` - runs a model off the async runtime
//! - `normalize` - raw detections to the API response schema
//! - `yolo` - YOLO ONNX model on ONNX Runtime (CPU)
//! - `preprocessing` / `postprocessing` - tensor conversion and box decoding

pub mod invoke;
pub mod normalize;
pub mod postprocessing;
pub mod preprocessing;
pub mod resolver;
pub mod yolo;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::vision::PixelBuffer;

pub use invoke::invoke;
pub use normalize::{normalize, DetectionRecord, DetectionResponse, NormalizeError};
pub use resolver::{bootstrap_default_model, ModelError, ModelResolver};
pub use yolo::{OnnxModelLoader, YoloOnnxModel};

/// Shared, read-only handle to a loaded model
pub type ModelHandle = Arc<dyn DetectionModel>;

/// One detected object as emitted by a model, before normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub class_id: usize,
    pub confidence: f32,
}

/// Class index to class name lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNames(BTreeMap<usize, String>);

impl ClassNames {
    pub fn new(names: BTreeMap<usize, String>) -> Self {
        Self(names)
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.0.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for ClassNames {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, name)| (id, name.into())).collect())
    }
}

/// Output of one inference call
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    /// Detections in the order the model emitted them
    pub detections: Vec<RawDetection>,
    pub names: Arc<ClassNames>,
}

/// What a model runs on: a decoded buffer or an image file on disk
#[derive(Debug, Clone)]
pub enum InferenceSource {
    Buffer(PixelBuffer),
    Path(PathBuf),
}

/// A loaded detection model.
///
/// Implementations must be safe to call from several requests at once.
pub trait DetectionModel: Send + Sync {
    /// Detections come back with the class-name table they refer to.
    fn infer(&self, source: &InferenceSource, confidence_threshold: f32)
        -> Result<DetectionBatch>;
}

/// Constructs models from files
#[cfg_attr(test, mockall::automock)]
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModelHandle>;
}
