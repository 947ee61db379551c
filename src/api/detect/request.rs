// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! `/detect` request parsing

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{header, StatusCode};
use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::errors::ApiError;
use crate::api::upload::{read_multipart, UploadedFile};

/// Form field, JSON key and query parameter naming the model file
pub const MODEL_PATH_FIELD: &str = "model_path";

/// Where the image came from, before decoding
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Multipart `file` part
    Upload(UploadedFile),
    /// Base64 text from a JSON `image` key or a urlencoded body
    Base64(String),
    Missing,
}

/// JSON body accepted by `/detect`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectJsonBody {
    /// Base64-encoded image, optionally with a data URI prefix
    #[serde(default)]
    pub image: Option<serde_json::Value>,

    #[serde(default)]
    pub model_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DetectRequest {
    pub model_path: Option<String>,
    pub image: ImagePayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Multipart,
    Json,
    UrlEncoded,
    Other,
}

fn body_kind(request: &Request) -> BodyKind {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "multipart/form-data" => BodyKind::Multipart,
        "application/json" => BodyKind::Json,
        "application/x-www-form-urlencoded" => BodyKind::UrlEncoded,
        _ => BodyKind::Other,
    }
}

fn query_model_path(request: &Request) -> Option<String> {
    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == MODEL_PATH_FIELD)
        .map(|(_, value)| value.into_owned())
}

async fn read_body(request: Request) -> Result<Bytes, ApiError> {
    Bytes::from_request(request, &()).await.map_err(|rejection| {
        let message = rejection.body_text();
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(message)
        } else {
            ApiError::InternalError(message)
        }
    })
}

impl DetectRequest {
    /// Split a `/detect` request into its model path and image payload.
    ///
    /// `model_path` is taken from the multipart form or JSON body, falling
    /// back to the query string. The image source is picked by content type:
    /// multipart `file` part, JSON `image` key, or the raw urlencoded body.
    /// A body that cannot be parsed for its content type reads as empty.
    pub async fn from_http(request: Request) -> Result<Self, ApiError> {
        let kind = body_kind(&request);
        let query_path = query_model_path(&request);
        debug!("Parsing /detect body as {:?}", kind);

        let (model_path, image) = match kind {
            BodyKind::Multipart => match Multipart::from_request(request, &()).await {
                Ok(multipart) => {
                    let mut form = read_multipart(multipart).await?;
                    let model_path = form.field(MODEL_PATH_FIELD).map(str::to_string);
                    let image = form
                        .file
                        .take()
                        .map(ImagePayload::Upload)
                        .unwrap_or(ImagePayload::Missing);
                    (model_path, image)
                }
                Err(rejection) => {
                    warn!("Unreadable multipart body: {}", rejection.body_text());
                    (None, ImagePayload::Missing)
                }
            },
            BodyKind::Json => {
                let bytes = read_body(request).await?;
                let body: DetectJsonBody = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                    warn!("Unreadable JSON body: {}", e);
                    DetectJsonBody::default()
                });
                let image = match body.image {
                    Some(serde_json::Value::String(text)) => ImagePayload::Base64(text),
                    _ => ImagePayload::Missing,
                };
                (body.model_path, image)
            }
            BodyKind::UrlEncoded => {
                let bytes = read_body(request).await?;
                let text = String::from_utf8_lossy(&bytes).into_owned();
                (None, ImagePayload::Base64(text))
            }
            BodyKind::Other => (None, ImagePayload::Missing),
        };

        Ok(Self {
            model_path: model_path.or(query_path),
            image,
        })
    }
}
