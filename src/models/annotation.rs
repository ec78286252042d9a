// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the bounding boxes edited on the canvas, the labels
//! they are assigned to, and the plain geometry values passed between the
//! canvas primitives and the controller.

use serde::{Deserialize, Serialize};

/// A 2D point in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check whether a point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

/// A named, colored category assignable to a bounding box.
///
/// Labels are owned by the project settings; the editor only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    /// Hex color such as `#ff8800`
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    /// Parse the label color into RGB components.
    ///
    /// Falls back to a neutral gray when the color is not `#RRGGBB`.
    pub fn rgb(&self) -> [u8; 3] {
        parse_hex_color(&self.color).unwrap_or([160, 160, 160])
    }
}

/// Parse a `#RRGGBB` (or `RRGGBB`) color string.
pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// A labeled bounding box on the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBox {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label_id: String,
    pub label_name: String,
    pub label_color: String,
}

impl AnnotationBox {
    /// Create a box with the given geometry and label.
    pub fn new(id: String, rect: BoxRect, label: &Label) -> Self {
        Self {
            id,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            label_id: label.id.clone(),
            label_name: label.name.clone(),
            label_color: label.color.clone(),
        }
    }

    pub fn rect(&self) -> BoxRect {
        BoxRect::new(self.x, self.y, self.width, self.height)
    }

    pub fn set_rect(&mut self, rect: BoxRect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }

    /// Reassign this box to another label.
    pub fn set_label(&mut self, label: &Label) {
        self.label_id = label.id.clone();
        self.label_name = label.name.clone();
        self.label_color = label.color.clone();
    }

    pub fn rgb(&self) -> [u8; 3] {
        parse_hex_color(&self.label_color).unwrap_or([160, 160, 160])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8800"), Some([255, 136, 0]));
        assert_eq!(parse_hex_color("00FF10"), Some([0, 255, 16]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn test_label_color_fallback() {
        let label = Label {
            id: "1".into(),
            name: "person".into(),
            color: "red".into(),
            description: None,
        };
        assert_eq!(label.rgb(), [160, 160, 160]);
    }

    #[test]
    fn test_rect_contains_edges() {
        let rect = BoxRect::new(10.0, 10.0, 20.0, 20.0);
        assert!(rect.contains(Point::new(10.0, 30.0)));
        assert!(!rect.contains(Point::new(30.5, 15.0)));
    }
}
