// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding: candidate filtering, NMS, class-name metadata

use std::sync::OnceLock;

use anyhow::Result;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use regex::Regex;

use super::preprocessing::Letterbox;
use super::{ClassNames, RawDetection};

/// IoU above which two same-class boxes are considered duplicates
pub const NMS_IOU_THRESHOLD: f32 = 0.7;

/// Upper bound on detections returned per image
pub const MAX_DETECTIONS: usize = 300;

/// Decode a raw YOLO output tensor into detections in original-image space.
///
/// Accepts `[1, 4 + nc, anchors]` (the standard export) or the transposed
/// `[1, anchors, 4 + nc]`. Detections come back sorted by descending
/// confidence after class-wise NMS.
pub fn decode_output(
    output: ArrayViewD<f32>,
    letterbox: &Letterbox,
    confidence_threshold: f32,
) -> Result<Vec<RawDetection>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected output shape: {:?}, expected [1, 4 + nc, N]", shape);
    }

    let predictions = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()?;

    // Anchors vastly outnumber classes, so the shorter axis holds the fields
    let predictions = if shape[1] <= shape[2] {
        predictions
    } else {
        predictions.reversed_axes()
    };

    if predictions.nrows() < 5 {
        anyhow::bail!(
            "Output has {} fields per anchor, need at least 5",
            predictions.nrows()
        );
    }

    let candidates = filter_candidates(predictions, confidence_threshold);
    let kept = non_max_suppression(candidates, NMS_IOU_THRESHOLD, MAX_DETECTIONS);

    Ok(kept
        .into_iter()
        .map(|d| {
            let (x1, y1) = letterbox.to_original(d.x1, d.y1);
            let (x2, y2) = letterbox.to_original(d.x2, d.y2);
            RawDetection {
                x1,
                y1,
                x2,
                y2,
                ..d
            }
        })
        .collect())
}

/// Pick the best class per anchor and drop anchors below the threshold.
/// Boxes stay in letterbox space, converted from center to corners.
fn filter_candidates(predictions: ArrayView2<f32>, confidence_threshold: f32) -> Vec<RawDetection> {
    let mut candidates = Vec::new();

    for anchor in predictions.axis_iter(Axis(1)) {
        let best = anchor
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (class_id, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((class_id, score)),
            });

        let Some((class_id, confidence)) = best else {
            continue;
        };
        if confidence.is_nan() || confidence <= confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        candidates.push(RawDetection {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            class_id,
            confidence,
        });
    }

    candidates
}

/// Greedy class-wise NMS. Output is ordered by descending confidence.
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

/// Intersection over union of two corner boxes
pub fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = ix * iy;

    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - intersection;

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Parse the `names` metadata written by YOLO exporters, e.g.
/// `{0: 'plastic', 1: "o'clock"}`.
pub fn parse_class_names(metadata: &str) -> ClassNames {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    let entry = ENTRY.get_or_init(|| {
        Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).expect("class name pattern is valid")
    });

    entry
        .captures_iter(metadata)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str().parse::<usize>().ok()?;
            let name = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((id, name))
        })
        .collect()
}

/// Class count implied by a static output shape.
///
/// Uses the same rule as [`decode_output`]: of the two trailing axes, the
/// shorter one holds the `4 + nc` fields. Dynamic axes (`-1`) are ignored.
pub fn class_count_from_shape(dims: &[i64]) -> Option<usize> {
    if dims.len() != 3 {
        return None;
    }
    let fields = dims[1..]
        .iter()
        .filter_map(|&d| usize::try_from(d).ok().filter(|&d| d > 0))
        .min()?;
    fields.checked_sub(4)
}

/// Placeholder names for models exported without metadata
pub fn generic_class_names(count: usize) -> ClassNames {
    (0..count).map(|id| (id, format!("class_{}", id))).collect()
}
