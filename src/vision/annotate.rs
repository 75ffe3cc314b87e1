// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounding-box annotation for detection results

use image::{DynamicImage, Rgb, RgbImage};

use super::detector::Detection;

/// Border thickness in pixels
const BOX_THICKNESS: u32 = 3;

const HEALTHY_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const SICK_COLOR: Rgb<u8> = Rgb([220, 0, 0]);

/// Whether a detection class counts as healthy
pub fn is_healthy_class(class_name: &str) -> bool {
    class_name.to_lowercase().contains("healthy")
}

/// Draw color-coded boxes (green = healthy, red = sick) on a copy of the
/// original image. Labels are left to the client, which receives the full
/// per-box record list.
pub fn draw_boxes(image: &DynamicImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for detection in detections {
        let color = if is_healthy_class(&detection.class_name) {
            HEALTHY_COLOR
        } else {
            SICK_COLOR
        };
        draw_rect_border(&mut canvas, &detection.bbox, color);
    }
    canvas
}

fn draw_rect_border(canvas: &mut RgbImage, bbox: &[f32; 4], color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let x1 = (bbox[0].max(0.0) as u32).min(width - 1);
    let y1 = (bbox[1].max(0.0) as u32).min(height - 1);
    let x2 = (bbox[2].max(0.0) as u32).min(width - 1);
    let y2 = (bbox[3].max(0.0) as u32).min(height - 1);
    if x2 <= x1 || y2 <= y1 {
        return;
    }

    for t in 0..BOX_THICKNESS {
        // Horizontal edges
        for x in x1..=x2 {
            let top = y1.saturating_add(t).min(height - 1);
            let bottom = y2.saturating_sub(t).max(y1);
            canvas.put_pixel(x, top, color);
            canvas.put_pixel(x, bottom, color);
        }
        // Vertical edges
        for y in y1..=y2 {
            let left = x1.saturating_add(t).min(width - 1);
            let right = x2.saturating_sub(t).max(x1);
            canvas.put_pixel(left, y, color);
            canvas.put_pixel(right, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(class_name: &str, bbox: [f32; 4]) -> Detection {
        Detection {
            class_id: 0,
            class_name: class_name.to_string(),
            confidence: 0.9,
            bbox,
        }
    }

    #[test]
    fn test_is_healthy_class() {
        assert!(is_healthy_class("healthy"));
        assert!(is_healthy_class("Healthy_Chicken"));
        assert!(!is_healthy_class("sick"));
    }

    #[test]
    fn test_draw_boxes_colors_edges() {
        let image = DynamicImage::new_rgb8(64, 64);
        let annotated = draw_boxes(
            &image,
            &[
                detection("healthy", [5.0, 5.0, 30.0, 30.0]),
                detection("sick", [35.0, 35.0, 60.0, 60.0]),
            ],
        );

        // Top-left corner of the healthy box is green
        assert_eq!(*annotated.get_pixel(5, 5), HEALTHY_COLOR);
        // Top-left corner of the sick box is red
        assert_eq!(*annotated.get_pixel(35, 35), SICK_COLOR);
        // A pixel well inside a box is untouched
        assert_eq!(*annotated.get_pixel(17, 17), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_boxes_clamps_out_of_bounds() {
        let image = DynamicImage::new_rgb8(32, 32);
        // Must not panic on boxes extending past the edges
        let annotated = draw_boxes(&image, &[detection("sick", [-10.0, -10.0, 100.0, 100.0])]);
        assert_eq!(annotated.dimensions(), (32, 32));
        assert_eq!(*annotated.get_pixel(0, 0), SICK_COLOR);
    }

    #[test]
    fn test_draw_boxes_ignores_degenerate_box() {
        let image = DynamicImage::new_rgb8(32, 32);
        let annotated = draw_boxes(&image, &[detection("sick", [10.0, 10.0, 10.0, 10.0])]);
        assert_eq!(*annotated.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_no_detections_leaves_image_unchanged() {
        let image = DynamicImage::new_rgb8(16, 16);
        let annotated = draw_boxes(&image, &[]);
        assert!(annotated.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
