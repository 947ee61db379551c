// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection with a client-chosen model
//!
//! Provides POST /detect. The model is loaded from the `model_path` sent with
//! the request and the image arrives as a multipart upload, a JSON body or a
//! urlencoded body.

pub mod handler;
pub mod request;

pub use handler::detect_handler;
pub use request::{DetectRequest, ImagePayload};
