// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /detect tests
//!
//! These tests verify that the detect handler:
//! - validates `model_path` before touching the loader
//! - accepts multipart, JSON and urlencoded images and decodes them alike
//! - loads a fresh model for every request
//! - maps decode, load and inference failures to the right status

use axum::http::StatusCode;
use image::ImageFormat;
use serde_json::json;
use wastevision_detect::detector::DetectionResponse;

use super::common::*;

fn path_str(file: &tempfile::NamedTempFile) -> String {
    file.path().to_string_lossy().to_string()
}

#[tokio::test]
async fn test_missing_model_path() {
    let dir = tempfile::tempdir().unwrap();
    let loader = CountingLoader::serving(StubModel::new(vec![]));
    let app = build_app(loader.clone(), None, dir.path());

    let body = multipart_body(&[], Some(("a.png", png_bytes().as_slice())));
    let (status, json) = send(app, multipart_request("/detect", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "model_path form field is required");
    assert_eq!(loader.loads(), 0);
}

#[tokio::test]
async fn test_nonexistent_model_path_never_loads() {
    let dir = tempfile::tempdir().unwrap();
    let loader = CountingLoader::serving(StubModel::new(vec![]));
    let app = build_app(loader.clone(), None, dir.path());

    let body = multipart_body(
        &[("model_path", "/nonexistent/weights.onnx")],
        Some(("a.png", png_bytes().as_slice())),
    );
    let (status, json) = send(app, multipart_request("/detect", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Model file not found at path: /nonexistent/weights.onnx"
    );
    assert_eq!(loader.loads(), 0, "no model construction attempted");
}

#[tokio::test]
async fn test_model_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let path = path_str(&model_file);
    let loader = CountingLoader::failing("invalid protobuf");
    let app = build_app(loader.clone(), None, dir.path());

    let (status, json) = send(
        app,
        json_request("/detect", json!({"image": png_base64(), "model_path": &path})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["error"],
        format!("Failed to load model '{}': invalid protobuf", path)
    );
    assert_eq!(loader.loads(), 1);
}

#[tokio::test]
async fn test_multipart_detection() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let model = StubModel::new(vec![
        raw(10.0, 20.0, 30.0, 60.0, 1, 0.9),
        raw(0.0, 0.0, 4.0, 4.0, 0, 0.4),
    ]);
    let app = build_app(CountingLoader::serving(model.clone()), None, dir.path());

    let body = multipart_body(
        &[("model_path", path_str(&model_file).as_str())],
        Some(("can.png", png_bytes().as_slice())),
    );
    let (status, json) = send(app, multipart_request("/detect", body)).await;

    assert_eq!(status, StatusCode::OK);
    let response: DetectionResponse = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(response.predictions.len(), 2);

    let first = &json["predictions"][0];
    assert_eq!(first["x"], 20.0);
    assert_eq!(first["y"], 40.0);
    assert_eq!(first["width"], 20.0);
    assert_eq!(first["height"], 40.0);
    assert_eq!(first["class"], "metal");
    assert_eq!(first["class_id"], 1);
    assert_eq!(first["detection_id"], "yolo_0");
    assert_eq!(json["predictions"][1]["detection_id"], "yolo_1");
    assert_eq!(json["predictions"][1]["class"], "plastic");

    assert_eq!(model.thresholds(), vec![0.25]);
    assert_eq!(model.buffers()[0].dimensions(), (8, 12));
}

#[tokio::test]
async fn test_no_detections_is_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let app = build_app(
        CountingLoader::serving(StubModel::new(vec![])),
        None,
        dir.path(),
    );

    let (status, json) = send(
        app,
        json_request(
            "/detect",
            json!({"image": png_base64(), "model_path": path_str(&model_file)}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"predictions": []}));
}

/// The same PNG delivered three ways reaches the model as the same buffer
#[tokio::test]
async fn test_encodings_decode_identically() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let path = path_str(&model_file);
    let model = StubModel::new(vec![]);
    let loader = CountingLoader::serving(model.clone());

    let multipart = multipart_request(
        "/detect",
        multipart_body(&[("model_path", path.as_str())], Some(("a.png", png_bytes().as_slice()))),
    );
    let json_body = json_request(
        "/detect",
        json!({"image": format!("data:image/png;base64,{}", png_base64()), "model_path": &path}),
    );
    let urlencoded = urlencoded_request(&format!("/detect?model_path={}", path), png_base64());

    for request in [multipart, json_body, urlencoded] {
        let app = build_app(loader.clone(), None, dir.path());
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    let buffers = model.buffers();
    assert_eq!(buffers.len(), 3);
    assert_eq!(buffers[0], buffers[1]);
    assert_eq!(buffers[1], buffers[2]);
    assert_eq!(buffers[0].channels(), 3);

    // BGR order: blue channel first
    let view = buffers[0].view();
    let expected = sample_rgb().get_pixel(3, 2).0;
    assert_eq!(view[[2, 3, 0]], expected[2]);
    assert_eq!(view[[2, 3, 2]], expected[0]);

    assert_eq!(loader.loads(), 3, "one fresh load per request");
}

#[tokio::test]
async fn test_empty_filename_rejected_before_decode() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let model = StubModel::new(vec![]);
    let app = build_app(CountingLoader::serving(model.clone()), None, dir.path());

    let body = multipart_body(
        &[("model_path", path_str(&model_file).as_str())],
        Some(("", png_bytes().as_slice())),
    );
    let (status, json) = send(app, multipart_request("/detect", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file selected");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_undecodable_upload() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let model = StubModel::new(vec![]);
    let app = build_app(CountingLoader::serving(model.clone()), None, dir.path());

    let body = multipart_body(
        &[("model_path", path_str(&model_file).as_str())],
        Some(("notes.txt", b"definitely not an image".as_slice())),
    );
    let (status, json) = send(app, multipart_request("/detect", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Could not decode image from uploaded file");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_missing_or_invalid_image_data() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let path = path_str(&model_file);
    let model = StubModel::new(vec![]);
    let loader = CountingLoader::serving(model.clone());

    let requests = [
        json_request("/detect", json!({"model_path": &path})),
        json_request("/detect", json!({"model_path": &path, "image": "!!!not-base64!!!"})),
        json_request("/detect", json!({"model_path": &path, "image": ""})),
        urlencoded_request(&format!("/detect?model_path={}", path), String::new()),
        multipart_request("/detect", multipart_body(&[("model_path", path.as_str())], None)),
    ];

    for request in requests {
        let app = build_app(loader.clone(), None, dir.path());
        let (status, json) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid or missing image data");
    }

    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_grayscale_base64_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let model = StubModel::new(vec![]);
    let app = build_app(CountingLoader::serving(model.clone()), None, dir.path());

    let gray = image::GrayImage::from_fn(5, 4, |x, _| image::Luma([(x * 40) as u8]));
    let mut png = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(gray)
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();
    let encoded = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        png.into_inner(),
    );

    let (status, _) = send(
        app,
        json_request(
            "/detect",
            json!({"image": encoded, "model_path": path_str(&model_file)}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let buffers = model.buffers();
    assert_eq!(buffers[0].channels(), 1);
    assert_eq!(buffers[0].dimensions(), (4, 5));
}

#[tokio::test]
async fn test_inference_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let app = build_app(
        CountingLoader::serving(StubModel::failing("tensor shape mismatch")),
        None,
        dir.path(),
    );

    let (status, json) = send(
        app,
        json_request(
            "/detect",
            json!({"image": png_base64(), "model_path": path_str(&model_file)}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["error"],
        "Detection failed due to an internal server error: tensor shape mismatch"
    );
}

#[tokio::test]
async fn test_unknown_class_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let app = build_app(
        CountingLoader::serving(StubModel::new(vec![raw(0.0, 0.0, 1.0, 1.0, 42, 0.9)])),
        None,
        dir.path(),
    );

    let (status, json) = send(
        app,
        json_request(
            "/detect",
            json!({"image": png_base64(), "model_path": path_str(&model_file)}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = json["error"].as_str().unwrap();
    assert!(message.starts_with("Detection failed due to an internal server error:"));
    assert!(message.contains("42"));
}

#[tokio::test]
async fn test_body_over_limit_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let model_file = model_file();
    let model = StubModel::new(vec![]);
    let app = build_app_with_limit(
        CountingLoader::serving(model.clone()),
        None,
        dir.path(),
        64,
    );

    let (status, _) = send(
        app,
        json_request(
            "/detect",
            json!({"image": png_base64(), "model_path": path_str(&model_file)}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(model.calls(), 0);
}
