// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod detect_file;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod upload;

pub use detect::{detect_handler, DetectRequest, ImagePayload};
pub use detect_file::detect_file_handler;
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{health_handler, HealthResponse};
pub use http_server::{create_app, start_server, AppState};
pub use upload::{persist_upload, read_multipart, MultipartForm, UploadedFile};
