// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart form reading and upload persistence

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::debug;

use super::errors::ApiError;
use crate::utils::secure_filename;

/// Multipart field holding the uploaded image
pub const FILE_FIELD: &str = "file";

/// A file part of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client, possibly empty
    pub file_name: String,
    pub bytes: Bytes,
}

/// Text fields and the `file` part of a multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Drain a multipart body.
///
/// A part only counts as the upload when it is named `file` and carries a
/// filename attribute; the first such part wins. Parts without a filename
/// are read as text fields.
pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Multipart error", e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        match file_name {
            Some(file_name) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read upload", e))?;
                if name == FILE_FIELD && form.file.is_none() {
                    debug!("Received upload '{}' ({} bytes)", file_name, bytes.len());
                    form.file = Some(UploadedFile { file_name, bytes });
                }
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read field", e))?;
                form.fields.entry(name).or_insert(text);
            }
        }
    }

    Ok(form)
}

fn multipart_error(context: &str, err: MultipartError) -> ApiError {
    let message = format!("{}: {}", context, err);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::InternalError(message)
    }
}

/// Write an upload into `dir` under a unique name ending in the sanitized
/// client filename. The file is deleted when the returned guard drops.
pub fn persist_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let sanitized = secure_filename(file_name);
    let suffix = if sanitized.is_empty() {
        String::new()
    } else {
        format!("_{}", sanitized)
    };

    let mut file = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(&suffix)
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;

    debug!("Persisted upload to {}", file.path().display());
    Ok(file)
}
