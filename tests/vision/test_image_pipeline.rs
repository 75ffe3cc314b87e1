// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Image decode → annotate → re-encode pipeline without any model

use flocksense::vision::annotate::draw_boxes;
use flocksense::vision::detector::Detection;
use flocksense::vision::image_utils::{
    decode_base64_image, decode_image_bytes, encode_jpeg_base64,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 80, 120]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

#[test]
fn test_decode_generated_png() {
    let bytes = png_bytes(32, 24);
    let (image, info) = decode_image_bytes(&bytes).unwrap();
    assert_eq!(info.format, ImageFormat::Png);
    assert_eq!((image.width(), image.height()), (32, 24));
    assert_eq!(info.size_bytes, bytes.len());
}

#[test]
fn test_annotate_and_reencode_roundtrip() {
    let bytes = png_bytes(64, 64);
    let (image, _info) = decode_image_bytes(&bytes).unwrap();

    let detections = vec![
        Detection {
            class_id: 0,
            class_name: "healthy".to_string(),
            confidence: 0.91,
            bbox: [4.0, 4.0, 28.0, 28.0],
        },
        Detection {
            class_id: 1,
            class_name: "sick".to_string(),
            confidence: 0.84,
            bbox: [34.0, 34.0, 60.0, 60.0],
        },
    ];

    let annotated = draw_boxes(&image, &detections);
    let encoded = encode_jpeg_base64(&annotated).unwrap();

    // The annotated image comes back as a decodable JPEG of the same size
    let (decoded, info) = decode_base64_image(&encoded).unwrap();
    assert_eq!(info.format, ImageFormat::Jpeg);
    assert_eq!((decoded.width(), decoded.height()), (64, 64));
}

#[test]
fn test_truncated_png_is_rejected() {
    let mut bytes = png_bytes(16, 16);
    bytes.truncate(20);
    assert!(decode_image_bytes(&bytes).is_err());
}
