// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod server;

pub use server::{
    ServerConfig, CONFIDENCE_THRESHOLD, DEFAULT_MODEL_PATH, DEFAULT_UPLOAD_DIR, MAX_UPLOAD_BYTES,
};
