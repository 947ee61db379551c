// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding for the three request transports
//!
//! Every transport ends in a [`PixelBuffer`]:
//! - multipart upload: raw container bytes, always decoded to 3-channel BGR
//! - JSON `image` field: base64 text, optionally behind a `data:...,` prefix
//! - urlencoded body: the whole body is base64 text

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ColorType, DynamicImage, ImageFormat};
use thiserror::Error;

use super::pixel_buffer::PixelBuffer;
use crate::config::MAX_UPLOAD_BYTES;

/// Custom error types for image decoding
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Unsupported color layout: {0:?}")]
    UnsupportedColor(ColorType),

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image data is empty")]
    EmptyData,
}

/// Decode raw container bytes (multipart uploads and persisted files).
///
/// Grayscale inputs are expanded and alpha is dropped, so the result always
/// has three BGR channels.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<PixelBuffer, ImageError> {
    let img = load_container(bytes)?;
    Ok(PixelBuffer::from_rgb(&img.to_rgb8()))
}

/// Decode a base64 image string.
///
/// Anything up to and including the first comma is treated as a data-URI
/// header and dropped. Color images are reordered to BGR; single-channel
/// grayscale images pass through unconverted.
///
/// # Example
/// ```ignore
/// let buffer = decode_base64_image("data:image/png;base64,iVBORw0KGgo...")?;
/// println!("{}x{}", buffer.width(), buffer.height());
/// ```
pub fn decode_base64_image(base64_str: &str) -> Result<PixelBuffer, ImageError> {
    let payload = strip_data_uri_prefix(base64_str);

    // Clients that wrap their base64 at 76 columns are common
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if compact.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let bytes = STANDARD.decode(compact.as_bytes())?;
    let img = load_container(&bytes)?;

    match img.color() {
        ColorType::L8 | ColorType::L16 => Ok(PixelBuffer::from_luma(&img.to_luma8())),
        ColorType::La8 | ColorType::La16 => Err(ImageError::UnsupportedColor(img.color())),
        _ => Ok(PixelBuffer::from_rgb(&img.to_rgb8())),
    }
}

/// Decode an image file from disk, with the same color rules as
/// [`decode_image_bytes`].
pub fn decode_image_file(path: &Path) -> Result<PixelBuffer, ImageError> {
    let bytes = std::fs::read(path)?;
    decode_image_bytes(&bytes)
}

/// Drop a `<scheme>,` header such as `data:image/jpeg;base64,`
pub fn strip_data_uri_prefix(input: &str) -> &str {
    match input.split_once(',') {
        Some((_, rest)) => rest,
        None => input,
    }
}

fn load_container(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ImageError::TooLarge(bytes.len(), MAX_UPLOAD_BYTES));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(ImageError::DecodeFailed("image has no pixels".to_string()));
    }

    Ok(img)
}

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}
