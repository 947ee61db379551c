// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection with the default model on an uploaded file
//!
//! Provides POST /detect-file.

pub mod handler;

pub use handler::detect_file_handler;
