// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection pipeline without ONNX Runtime
//!
//! Decodes a real image, letterboxes it, feeds a synthetic YOLO output
//! through box decoding and checks the normalized response is in the
//! original image's coordinates.

use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbImage};
use ndarray::Array3;
use wastevision_detect::config::CONFIDENCE_THRESHOLD;
use wastevision_detect::detector::{
    normalize,
    postprocessing::{decode_output, parse_class_names},
    preprocessing::{letterbox, YOLO_INPUT_SIZE},
    DetectionBatch,
};
use wastevision_detect::vision::decode_image_bytes;

fn wide_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(200, 100, image::Rgb([10, 200, 30]));
    let mut out = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// `[1, 4 + 3, 16]` output with one confident anchor per given row
fn yolo_output(rows: &[[f32; 7]]) -> Array3<f32> {
    let mut out = Array3::zeros((1, 7, 16));
    for (a, row) in rows.iter().enumerate() {
        for (f, v) in row.iter().enumerate() {
            out[[0, f, a]] = *v;
        }
    }
    out
}

#[test]
fn test_boxes_map_back_to_original_image() {
    let buffer = decode_image_bytes(&wide_png()).unwrap();
    let lb = letterbox(&buffer, YOLO_INPUT_SIZE);

    assert_eq!(lb.scale, 3.2);
    assert_eq!((lb.pad_x, lb.pad_y), (0.0, 160.0));

    // Original box (50, 25)-(100, 75) is (160, 240)-(320, 400) after letterboxing
    let output = yolo_output(&[
        [240.0, 320.0, 160.0, 160.0, 0.05, 0.92, 0.01],
        [600.0, 200.0, 20.0, 20.0, 0.10, 0.05, 0.20],
    ]);

    let detections =
        decode_output(output.view().into_dyn(), &lb, CONFIDENCE_THRESHOLD).unwrap();
    assert_eq!(detections.len(), 1, "second anchor is below the threshold");

    let names = parse_class_names("{0: 'plastic', 1: 'glass', 2: 'metal'}");
    let response = normalize(&DetectionBatch {
        detections,
        names: Arc::new(names),
    })
    .unwrap();

    let record = &response.predictions[0];
    assert_eq!(record.class_name, "glass");
    assert_eq!(record.class_id, 1);
    assert_eq!(record.detection_id, "yolo_0");
    assert!((record.x - 75.0).abs() < 1e-3);
    assert!((record.y - 50.0).abs() < 1e-3);
    assert!((record.width - 50.0).abs() < 1e-3);
    assert!((record.height - 50.0).abs() < 1e-3);
}

#[test]
fn test_boxes_clamped_to_image_bounds() {
    let buffer = decode_image_bytes(&wide_png()).unwrap();
    let lb = letterbox(&buffer, YOLO_INPUT_SIZE);

    // Box spilling into the bottom padding band
    let output = yolo_output(&[[320.0, 480.0, 700.0, 40.0, 0.9, 0.0, 0.0]]);
    let detections =
        decode_output(output.view().into_dyn(), &lb, CONFIDENCE_THRESHOLD).unwrap();

    let d = detections[0];
    assert_eq!(d.x1, 0.0);
    assert_eq!(d.x2, 200.0);
    assert_eq!(d.y2, 100.0);
    assert!(d.y1 < 100.0);
}

#[test]
fn test_letterbox_pads_with_gray() {
    let buffer = decode_image_bytes(&wide_png()).unwrap();
    let lb = letterbox(&buffer, YOLO_INPUT_SIZE);

    let pad = 114.0 / 255.0;
    assert!((lb.tensor[[0, 0, 10, 320]] - pad).abs() < 1e-6);
    // Image content is RGB in the tensor: green channel dominant
    assert!((lb.tensor[[0, 1, 320, 320]] - 200.0 / 255.0).abs() < 1e-2);
    assert!(lb.tensor[[0, 0, 320, 320]] < 0.1);
}
