// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Letterbox preprocessing for YOLO models

use image::{imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

use crate::vision::PixelBuffer;

/// Square input edge expected by exported YOLO models
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Padding color used around the resized image
pub const PAD_VALUE: u8 = 114;

/// A letterboxed input tensor plus what is needed to map boxes back
#[derive(Debug, Clone)]
pub struct Letterbox {
    /// NCHW tensor `[1, 3, size, size]`, RGB, scaled to 0..1
    pub tensor: Array4<f32>,
    /// Resize factor applied to the original image
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    /// Map a point from letterbox space back to the original image, clamped
    /// to its bounds
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = ((x - self.pad_x) / self.scale).clamp(0.0, self.orig_width as f32);
        let oy = ((y - self.pad_y) / self.scale).clamp(0.0, self.orig_height as f32);
        (ox, oy)
    }
}

/// Resize preserving aspect ratio, pad to a square and build the tensor
pub fn letterbox(buffer: &PixelBuffer, target_size: u32) -> Letterbox {
    let rgb = buffer.to_rgb_image();
    let (orig_w, orig_h) = rgb.dimensions();

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

    let resized = if (new_w, new_h) == (orig_w, orig_h) {
        rgb
    } else {
        image::imageops::resize(&rgb, new_w, new_h, FilterType::Triangle)
    };

    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;

    let mut canvas = RgbImage::from_pixel(target_size, target_size, Rgb([PAD_VALUE; 3]));
    image::imageops::replace(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    let size = target_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    Letterbox {
        tensor,
        scale,
        pad_x: offset_x as f32,
        pad_y: offset_y as f32,
        orig_width: orig_w,
        orig_height: orig_h,
    }
}
