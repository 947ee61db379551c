// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every value can come from a CLI flag or an environment variable
//! (`.env` files are honoured). Defaults reproduce the fixed constants the
//! service has always run with.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Maximum accepted request body (16 MiB)
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Confidence threshold passed to every inference call. Not configurable.
pub const CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Location of the model loaded once at startup
pub const DEFAULT_MODEL_PATH: &str = "./models/best.onnx";

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

/// WasteVision object detection service
#[derive(Parser, Debug, Clone)]
#[command(name = "wastevision-detect")]
#[command(version)]
#[command(about = "HTTP object detection service backed by a YOLO ONNX model", long_about = None)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Model loaded at startup and used by /detect-file
    #[arg(long, env = "DEFAULT_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub default_model_path: PathBuf,

    /// Directory for temporary upload files
    #[arg(long, env = "UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    pub upload_dir: PathBuf,

    /// Request body ceiling in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// ONNX Runtime intra-op threads per model session
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            default_model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            intra_threads: 4,
        }
    }
}
