// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! `/detect-file` endpoint handler

use axum::extract::{FromRequest, Request, State};
use axum::Json;
use axum_extra::extract::Multipart;
use tracing::{debug, info, warn};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::upload::{persist_upload, read_multipart};
use crate::config::CONFIDENCE_THRESHOLD;
use crate::detector::{invoke, normalize, DetectionResponse, InferenceSource};
use crate::vision::decode_image_file;

fn internal_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::InternalError(format!("Detection failed: {}", err))
}

/// POST /detect-file - Detect objects with the default model
///
/// The upload is written to the upload directory and the model reads it from
/// there. The file is removed before the response is sent, whatever the
/// outcome.
///
/// # Errors
/// - 400 Bad Request: no `file` part, empty filename, unreadable image
/// - 413 Payload Too Large: body over the upload ceiling
/// - 500 Internal Server Error: default model not loaded, inference failure
pub async fn detect_file_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<DetectionResponse>, ApiError> {
    let no_file = || ApiError::ValidationError("No file provided".to_string());

    let multipart = Multipart::from_request(request, &()).await.map_err(|rejection| {
        debug!("No multipart body: {}", rejection.body_text());
        no_file()
    })?;
    let upload = read_multipart(multipart)
        .await
        .map_err(|e| match e {
            ApiError::InternalError(message) => internal_error(message),
            other => other,
        })?
        .file
        .ok_or_else(no_file)?;

    if upload.file_name.is_empty() {
        return Err(ApiError::ValidationError("No file selected".to_string()));
    }

    let model = state.resolver.default_model()?;

    // Write and decode off the runtime; an early return drops the temp file
    let upload_dir = state.upload_dir.clone();
    let (temp_file, buffer) = tokio::task::spawn_blocking(move || {
        let temp_file = persist_upload(&upload_dir, &upload.file_name, &upload.bytes)
            .map_err(internal_error)?;
        let buffer = decode_image_file(temp_file.path()).map_err(|e| {
            warn!("Uploaded file '{}' is not a readable image: {}", upload.file_name, e);
            ApiError::DecodeError("Invalid image file".to_string())
        })?;
        Ok::<_, ApiError>((temp_file, buffer))
    })
    .await
    .map_err(internal_error)??;

    let path = temp_file.path().to_path_buf();
    let (height, width) = buffer.dimensions();
    debug!("Persisted image {}x{} at {}", width, height, path.display());

    let batch = invoke(model, InferenceSource::Path(path), CONFIDENCE_THRESHOLD)
        .await
        .map_err(|e| internal_error(format!("{:#}", e)))?;
    let response = normalize(&batch).map_err(internal_error)?;

    drop(temp_file);
    info!("/detect-file returned {} predictions", response.predictions.len());
    Ok(Json(response))
}
