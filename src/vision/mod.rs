// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding into the pixel buffer consumed by the detector

pub mod image_utils;
pub mod pixel_buffer;

pub use image_utils::{
    decode_base64_image, decode_image_bytes, decode_image_file, detect_format, ImageError,
};
pub use pixel_buffer::PixelBuffer;
