// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! `/detect` endpoint handler

use axum::extract::{Request, State};
use axum::Json;
use tracing::{debug, info, warn};

use super::request::{DetectRequest, ImagePayload};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::config::CONFIDENCE_THRESHOLD;
use crate::detector::{invoke, normalize, DetectionResponse, InferenceSource};
use crate::vision::{decode_base64_image, decode_image_bytes, PixelBuffer};

fn internal_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::InternalError(format!(
        "Detection failed due to an internal server error: {}",
        err
    ))
}

/// POST /detect - Detect objects with the model at `model_path`
///
/// The model is loaded fresh for this request and dropped afterwards.
///
/// # Request
/// - `model_path`: path of a model file on the server (form field, JSON key
///   or query parameter)
/// - image: multipart `file`, JSON `image` (base64, data URI prefix allowed)
///   or a urlencoded body holding the base64 text
///
/// # Errors
/// - 400 Bad Request: missing `model_path`, model file absent, empty
///   filename, undecodable or missing image
/// - 413 Payload Too Large: body over the upload ceiling
/// - 500 Internal Server Error: model load or inference failure
pub async fn detect_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<DetectionResponse>, ApiError> {
    let request = DetectRequest::from_http(request)
        .await
        .map_err(|e| match e {
            ApiError::InternalError(message) => internal_error(message),
            other => other,
        })?;

    let model = state
        .resolver
        .resolve_by_path(request.model_path.as_deref())
        .await?;

    let image = request.image;
    let buffer = tokio::task::spawn_blocking(move || decode_payload(image))
        .await
        .map_err(internal_error)??;
    let (height, width) = buffer.dimensions();
    debug!("Decoded image {}x{} ({} channels)", width, height, buffer.channels());

    let batch = invoke(model, InferenceSource::Buffer(buffer), CONFIDENCE_THRESHOLD)
        .await
        .map_err(|e| internal_error(format!("{:#}", e)))?;
    let response = normalize(&batch).map_err(internal_error)?;

    info!("/detect returned {} predictions", response.predictions.len());
    Ok(Json(response))
}

fn decode_payload(image: ImagePayload) -> Result<PixelBuffer, ApiError> {
    let decoded = match image {
        ImagePayload::Upload(file) => {
            if file.file_name.is_empty() {
                return Err(ApiError::ValidationError("No file selected".to_string()));
            }
            return decode_image_bytes(&file.bytes).map_err(|e| {
                warn!("Could not decode uploaded file '{}': {}", file.file_name, e);
                ApiError::DecodeError("Could not decode image from uploaded file".to_string())
            });
        }
        ImagePayload::Base64(text) => match decode_base64_image(&text) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                warn!("Error decoding base64 image: {}", e);
                None
            }
        },
        ImagePayload::Missing => None,
    };

    decoded.ok_or_else(|| ApiError::DecodeError("Invalid or missing image data".to_string()))
}
