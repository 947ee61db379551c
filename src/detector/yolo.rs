// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detection on ONNX Runtime
//!
//! Loads YOLOv8-style exports (`[1, 3, 640, 640]` in, `[1, 4 + nc, N]` out)
//! and runs them on the CPU execution provider.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info, warn};

use super::postprocessing::{
    class_count_from_shape, decode_output, generic_class_names, parse_class_names,
};
use super::preprocessing::{letterbox, YOLO_INPUT_SIZE};
use super::{ClassNames, DetectionBatch, DetectionModel, InferenceSource, ModelHandle, ModelLoader};
use crate::vision::{decode_image_file, PixelBuffer};

/// YOLO detection model backed by an ONNX Runtime session
pub struct YoloOnnxModel {
    /// ONNX Runtime session; `run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    names: Arc<ClassNames>,
    input_size: u32,
    model_path: PathBuf,
}

impl std::fmt::Debug for YoloOnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloOnnxModel")
            .field("model_path", &self.model_path)
            .field("input_name", &self.input_name)
            .field("classes", &self.names.len())
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl YoloOnnxModel {
    /// Load a YOLO ONNX export from a file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The file is not a loadable ONNX graph
    pub fn load<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("YOLO model not found: {}", model_path.display());
        }

        info!("Loading YOLO model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load YOLO model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let names = match session.metadata().and_then(|m| m.custom("names")) {
            Ok(Some(raw)) => parse_class_names(&raw),
            Ok(None) => ClassNames::default(),
            Err(e) => {
                warn!("Could not read model metadata: {}", e);
                ClassNames::default()
            }
        };

        let names = if names.is_empty() {
            let count = class_count_from_outputs(&session).unwrap_or(0);
            warn!(
                "No class names in {} metadata, using {} generic names",
                model_path.display(),
                count
            );
            generic_class_names(count)
        } else {
            names
        };

        debug!(
            "YOLO model loaded - input: {}, classes: {}",
            input_name,
            names.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            names: Arc::new(names),
            input_size: YOLO_INPUT_SIZE,
            model_path: model_path.to_path_buf(),
        })
    }

    fn detect(&self, buffer: &PixelBuffer, confidence_threshold: f32) -> Result<DetectionBatch> {
        let mut lb = letterbox(buffer, self.input_size);
        let tensor = std::mem::take(&mut lb.tensor);

        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("YOLO session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("YOLO inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("YOLO output shape: {:?}", output_tensor.shape());

        let detections = decode_output(output_tensor.view(), &lb, confidence_threshold)?;

        Ok(DetectionBatch {
            detections,
            names: self.names.clone(),
        })
    }
}

impl DetectionModel for YoloOnnxModel {
    fn infer(
        &self,
        source: &InferenceSource,
        confidence_threshold: f32,
    ) -> Result<DetectionBatch> {
        let buffer = match source {
            InferenceSource::Buffer(buffer) => Cow::Borrowed(buffer),
            InferenceSource::Path(path) => Cow::Owned(
                decode_image_file(path)
                    .with_context(|| format!("Failed to read image {}", path.display()))?,
            ),
        };

        self.detect(&buffer, confidence_threshold)
    }
}

/// Class count implied by the first output's static shape
fn class_count_from_outputs(session: &Session) -> Option<usize> {
    let output = session.outputs.first()?;
    let dims = output.output_type.tensor_shape()?;
    class_count_from_shape(dims)
}

/// Production loader: builds a [`YoloOnnxModel`] per call
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    intra_threads: usize,
}

impl OnnxModelLoader {
    pub fn new(intra_threads: usize) -> Self {
        Self { intra_threads }
    }
}

impl Default for OnnxModelLoader {
    fn default() -> Self {
        Self::new(4)
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self, path: &Path) -> Result<ModelHandle> {
        let model = YoloOnnxModel::load(path, self.intra_threads)?;
        Ok(Arc::new(model))
    }
}
