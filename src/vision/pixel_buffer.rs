// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory pixel buffer handed to the detection model

use image::{GrayImage, RgbImage};
use ndarray::{Array3, ArrayView3};

/// Decoded image as a `height x width x channels` array of bytes.
///
/// Three-channel buffers are always in BGR order. A single-channel buffer is
/// a grayscale image that was passed through without color conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Array3<u8>,
}

impl PixelBuffer {
    /// Build a BGR buffer from an RGB image
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let (width, height) = rgb.dimensions();
        let mut data = Array3::<u8>::zeros((height as usize, width as usize, 3));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (row, col) = (y as usize, x as usize);
            data[[row, col, 0]] = pixel[2];
            data[[row, col, 1]] = pixel[1];
            data[[row, col, 2]] = pixel[0];
        }

        Self { data }
    }

    /// Build a single-channel buffer from a grayscale image
    pub fn from_luma(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let mut data = Array3::<u8>::zeros((height as usize, width as usize, 1));

        for (x, y, pixel) in gray.enumerate_pixels() {
            data[[y as usize, x as usize, 0]] = pixel[0];
        }

        Self { data }
    }

    pub fn height(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn channels(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn is_color(&self) -> bool {
        self.channels() == 3
    }

    /// `(height, width)`, the order the handlers measure dimensions in
    pub fn dimensions(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// Convert back to an RGB image for model preprocessing.
    ///
    /// Grayscale buffers are replicated across the three channels.
    pub fn to_rgb_image(&self) -> RgbImage {
        let color = self.is_color();
        RgbImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            let (row, col) = (y as usize, x as usize);
            if color {
                image::Rgb([
                    self.data[[row, col, 2]],
                    self.data[[row, col, 1]],
                    self.data[[row, col, 0]],
                ])
            } else {
                let v = self.data[[row, col, 0]];
                image::Rgb([v, v, v])
            }
        })
    }
}
