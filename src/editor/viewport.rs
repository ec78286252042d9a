// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pan and zoom of the canvas.
//!
//! Screen positions are relative to the canvas widget's top-left corner.
//! `screen = image * scale + offset`.

use crate::models::annotation::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Viewport {
    /// Fit and center an image inside a canvas of the given size.
    pub fn fit(image_size: (f64, f64), canvas_size: (f64, f64)) -> Self {
        let (iw, ih) = image_size;
        let (cw, ch) = canvas_size;
        if iw <= 0.0 || ih <= 0.0 || cw <= 0.0 || ch <= 0.0 {
            return Self::default();
        }
        let scale = (cw / iw).min(ch / ih);
        Self {
            scale,
            offset_x: (cw - iw * scale) / 2.0,
            offset_y: (ch - ih * scale) / 2.0,
        }
    }

    pub fn screen_to_image(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.offset_x) / self.scale,
            (screen.y - self.offset_y) / self.scale,
        )
    }

    pub fn image_to_screen(&self, image: Point) -> Point {
        Point::new(
            image.x * self.scale + self.offset_x,
            image.y * self.scale + self.offset_y,
        )
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Change the scale while keeping the image point under `cursor` fixed.
    pub fn zoom_at(&mut self, new_scale: f64, cursor: Point) {
        let anchor = self.screen_to_image(cursor);
        self.scale = new_scale;
        self.offset_x = cursor.x - anchor.x * new_scale;
        self.offset_y = cursor.y - anchor.y * new_scale;
    }
}
