// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the WasteVision detection service

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-yolo-onnx-2025-11-03";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Major version number
pub const VERSION_MAJOR: u32 = 1;

/// Minor version number
pub const VERSION_MINOR: u32 = 0;

/// Patch version number
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2025-11-03";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "detect-by-model-path",
    "detect-file-default-model",
    "multipart-upload",
    "base64-json",
    "base64-urlencoded",
    "onnx-runtime-cpu",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("WasteVision Detect {} ({})", VERSION_NUMBER, BUILD_DATE)
}
