// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module bounds boxes to the image, derives scale-aware chrome sizes,
//! and converts between pixel coordinates and the normalized fractions used
//! by the annotation store.

use crate::config::Style;
use crate::models::annotation::{BoxRect, Point};

/// Minimum width and height of a committed box, in image pixels.
pub const MIN_SIZE: f64 = 10.0;

/// Clamp a box position so the box stays inside the image.
///
/// Returns `(max(0, min(x, iw - w)), max(0, min(y, ih - h)))`.
pub fn clamp_position(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    image_width: f64,
    image_height: f64,
) -> (f64, f64) {
    (
        x.min(image_width - width).max(0.0),
        y.min(image_height - height).max(0.0),
    )
}

/// Resolve size first (floor at `MIN_SIZE`, cap at the image), then position.
pub fn clamp_size(rect: BoxRect, image_width: f64, image_height: f64) -> BoxRect {
    let width = rect.width.max(MIN_SIZE).min(image_width);
    let height = rect.height.max(MIN_SIZE).min(image_height);
    let (x, y) = clamp_position(rect.x, rect.y, width, height, image_width, image_height);
    BoxRect::new(x, y, width, height)
}

/// Clamp a point to the image area.
pub fn clamp_point(point: Point, image_width: f64, image_height: f64) -> Point {
    Point::new(
        point.x.clamp(0.0, image_width.max(0.0)),
        point.y.clamp(0.0, image_height.max(0.0)),
    )
}

/// Rectangle spanned by two corner points, in any order.
pub fn rect_from_corners(a: Point, b: Point) -> BoxRect {
    BoxRect::new(
        a.x.min(b.x),
        a.y.min(b.y),
        (a.x - b.x).abs(),
        (a.y - b.y).abs(),
    )
}

pub fn meets_min_size(rect: &BoxRect) -> bool {
    rect.width >= MIN_SIZE && rect.height >= MIN_SIZE
}

pub fn is_within_image(rect: &BoxRect, image_width: f64, image_height: f64) -> bool {
    rect.x >= 0.0 && rect.y >= 0.0 && rect.right() <= image_width && rect.bottom() <= image_height
}

/// Chrome sizes in image pixels for the current zoom.
///
/// Every value is `base / scale`, so strokes, labels and handles keep a
/// constant on-screen size however far the canvas is zoomed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledMetrics {
    pub stroke_width: f64,
    pub label_height: f64,
    pub label_padding: f64,
    pub font_size: f64,
    pub handle_size: f64,
}

impl ScaledMetrics {
    pub fn for_scale(scale: f64, style: &Style) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        Self {
            stroke_width: style.stroke_width / scale,
            label_height: style.label_height / scale,
            label_padding: style.label_padding / scale,
            font_size: style.label_font_size / scale,
            handle_size: style.handle_size / scale,
        }
    }
}

/// Convert pixel coordinates to normalized coordinates (0.0 to 1.0).
pub fn normalize_coordinates(pixel_x: f64, pixel_y: f64, width: u32, height: u32) -> Point {
    Point {
        x: pixel_x / width as f64,
        y: pixel_y / height as f64,
    }
}

/// Convert normalized coordinates to pixel coordinates.
pub fn denormalize_coordinates(point: &Point, width: u32, height: u32) -> (f64, f64) {
    (point.x * width as f64, point.y * height as f64)
}

/// Convert a pixel-space box to normalized fractions of the image.
pub fn normalize_rect(rect: &BoxRect, width: u32, height: u32) -> BoxRect {
    let origin = normalize_coordinates(rect.x, rect.y, width, height);
    let size = normalize_coordinates(rect.width, rect.height, width, height);
    BoxRect::new(origin.x, origin.y, size.x, size.y)
}

/// Convert a normalized box back to pixel space.
pub fn denormalize_rect(rect: &BoxRect, width: u32, height: u32) -> BoxRect {
    let (x, y) = denormalize_coordinates(&Point::new(rect.x, rect.y), width, height);
    let (w, h) = denormalize_coordinates(&Point::new(rect.width, rect.height), width, height);
    BoxRect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_denormalize_roundtrip() {
        let width = 1920;
        let height = 1080;
        let pixel_x = 960.0;
        let pixel_y = 540.0;

        let normalized = normalize_coordinates(pixel_x, pixel_y, width, height);
        let (denorm_x, denorm_y) = denormalize_coordinates(&normalized, width, height);

        assert!((denorm_x - pixel_x).abs() < 0.0001);
        assert!((denorm_y - pixel_y).abs() < 0.0001);
    }

    #[test]
    fn test_normalize_rect() {
        let rect = BoxRect::new(192.0, 108.0, 960.0, 540.0);
        let normalized = normalize_rect(&rect, 1920, 1080);
        assert!((normalized.x - 0.1).abs() < 1e-9);
        assert!((normalized.height - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(-30.0, -10.0, 50.0, 50.0, 1920.0, 1080.0), (0.0, 0.0));
        assert_eq!(
            clamp_position(1900.0, 1070.0, 50.0, 50.0, 1920.0, 1080.0),
            (1870.0, 1030.0)
        );
        assert_eq!(clamp_position(100.0, 200.0, 50.0, 50.0, 1920.0, 1080.0), (100.0, 200.0));
    }

    #[test]
    fn test_clamp_position_box_larger_than_image() {
        // A box wider than the image pins to the origin
        assert_eq!(clamp_position(5.0, 5.0, 300.0, 300.0, 200.0, 200.0), (0.0, 0.0));
    }

    #[test]
    fn test_clamp_size_resolves_size_before_position() {
        let rect = clamp_size(BoxRect::new(150.0, 90.0, 300.0, 4.0), 200.0, 100.0);
        assert_eq!(rect, BoxRect::new(0.0, 90.0, 200.0, MIN_SIZE));
    }

    #[test]
    fn test_rect_from_corners_any_order() {
        let rect = rect_from_corners(Point::new(300.0, 250.0), Point::new(100.0, 100.0));
        assert_eq!(rect, BoxRect::new(100.0, 100.0, 200.0, 150.0));
    }

    #[test]
    fn test_scaled_metrics_follow_scale() {
        let style = Style::default();
        let zoomed = ScaledMetrics::for_scale(2.0, &style);
        assert_eq!(zoomed.stroke_width, style.stroke_width / 2.0);
        assert_eq!(zoomed.handle_size, style.handle_size / 2.0);
        let fallback = ScaledMetrics::for_scale(0.0, &style);
        assert_eq!(fallback.font_size, style.label_font_size);
    }
}
