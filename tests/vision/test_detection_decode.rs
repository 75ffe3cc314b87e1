// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection post-processing: output decoding, coordinate mapping and NMS
//! over realistic multi-box scenarios

use flocksense::vision::detector::{
    decode_predictions, non_max_suppression, Letterbox,
};
use ndarray::Array2;

fn class_names() -> Vec<String> {
    vec!["healthy".to_string(), "sick".to_string()]
}

/// Build a `[4+nc, N]` matrix from (cx, cy, w, h, healthy, sick) rows
fn predictions(rows: &[[f32; 6]]) -> Array2<f32> {
    let mut matrix = Array2::<f32>::zeros((6, rows.len()));
    for (anchor, row) in rows.iter().enumerate() {
        for (i, value) in row.iter().enumerate() {
            matrix[[i, anchor]] = *value;
        }
    }
    matrix
}

#[test]
fn test_full_decode_and_nms_pipeline() {
    // 640x480 image letterboxed into 640x640 (scale 1.0, pad_y 80)
    let lb = Letterbox::fit(640, 480, 640);
    assert_eq!(lb.scale, 1.0);
    assert_eq!(lb.pad_y, 80.0);

    let matrix = predictions(&[
        // Confident sick chicken
        [100.0, 180.0, 60.0, 60.0, 0.05, 0.92],
        // Near-duplicate of the same bird, lower confidence
        [102.0, 182.0, 60.0, 60.0, 0.04, 0.78],
        // Separate healthy chicken
        [400.0, 300.0, 80.0, 70.0, 0.88, 0.02],
        // Noise below threshold
        [500.0, 500.0, 30.0, 30.0, 0.3, 0.2],
    ]);

    let decoded = decode_predictions(matrix.view(), &class_names(), 0.6, &lb, 640.0, 480.0);
    assert_eq!(decoded.len(), 3);

    let kept = non_max_suppression(decoded, 0.45);
    assert_eq!(kept.len(), 2);

    let sick = kept.iter().find(|d| d.class_name == "sick").unwrap();
    // cy 180 in model space -> (180 - 80) / 1.0 = 100 in image space
    assert!((sick.bbox[1] - 70.0).abs() < 1e-2); // 180 - 30 - 80
    assert!((sick.bbox[3] - 130.0).abs() < 1e-2); // 180 + 30 - 80

    let healthy = kept.iter().find(|d| d.class_name == "healthy").unwrap();
    assert!((healthy.confidence - 0.88).abs() < 1e-6);
}

#[test]
fn test_downscaled_coordinates_map_back() {
    // 1920x1080 downscaled into 640: scale = 1/3, pad_y = 140
    let lb = Letterbox::fit(1920, 1080, 640);
    assert!((lb.scale - 1.0 / 3.0).abs() < 1e-6);

    let matrix = predictions(&[[320.0, 320.0, 120.0, 90.0, 0.1, 0.9]]);
    let decoded = decode_predictions(matrix.view(), &class_names(), 0.5, &lb, 1920.0, 1080.0);
    assert_eq!(decoded.len(), 1);

    let bbox = decoded[0].bbox;
    // Model-space center (320, 320) -> image center (960, 540)
    let cx = (bbox[0] + bbox[2]) / 2.0;
    let cy = (bbox[1] + bbox[3]) / 2.0;
    assert!((cx - 960.0).abs() < 1.0);
    assert!((cy - 540.0).abs() < 1.0);
    // 120px wide in model space -> 360px in image space
    assert!(((bbox[2] - bbox[0]) - 360.0).abs() < 1.0);
}

#[test]
fn test_everything_below_threshold_yields_empty() {
    let lb = Letterbox::fit(640, 640, 640);
    let matrix = predictions(&[
        [100.0, 100.0, 50.0, 50.0, 0.4, 0.3],
        [200.0, 200.0, 50.0, 50.0, 0.1, 0.55],
    ]);
    let decoded = decode_predictions(matrix.view(), &class_names(), 0.6, &lb, 640.0, 640.0);
    assert!(decoded.is_empty());
}
