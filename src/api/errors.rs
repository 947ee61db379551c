// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::detector::ModelError;

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request failures, each carrying the message sent to the client as is
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// A required field is missing
    #[error("{0}")]
    ValidationError(String),
    /// The referenced model path does not exist
    #[error("{0}")]
    NotFound(String),
    /// The image payload could not be decoded
    #[error("{0}")]
    DecodeError(String),
    /// Model construction failed
    #[error("{0}")]
    LoadError(String),
    /// The default model was never loaded
    #[error("{0}")]
    Unavailable(String),
    /// The request body exceeds the upload ceiling
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::NotFound(_) | ApiError::DecodeError(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::LoadError(_) | ApiError::Unavailable(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        let message = err.to_string();
        match err {
            ModelError::MissingPath => ApiError::ValidationError(message),
            ModelError::NotFound(_) => ApiError::NotFound(message),
            ModelError::Load { .. } => ApiError::LoadError(message),
            ModelError::Unavailable => ApiError::Unavailable(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status.as_u16(), self);
        }
        (status, Json(self.to_response())).into_response()
    }
}
