// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Painting of a single bounding box.
//!
//! Geometry arrives in image pixels and is mapped through the viewport.
//! Chrome sizes come from `ScaledMetrics`, which are image-space lengths,
//! so multiplying them back by the scale gives a constant on-screen size.

use crate::editor::bounding_box::{label_origin, Handle};
use crate::editor::viewport::Viewport;
use crate::models::annotation::{BoxRect, Point};
use crate::util::geometry::ScaledMetrics;

/// How a box should be drawn this frame.
pub struct BoxPaint<'a> {
    pub rect: BoxRect,
    pub color: egui::Color32,
    /// Floating label text, when the label is visible
    pub label: Option<&'a str>,
    pub selected: bool,
    /// Width × height text shown while resizing
    pub readout: Option<&'a str>,
}

/// Converts image-space geometry to screen positions inside the canvas.
pub struct ScreenMapper {
    pub origin: egui::Pos2,
    pub viewport: Viewport,
}

impl ScreenMapper {
    pub fn pos(&self, image: Point) -> egui::Pos2 {
        let screen = self.viewport.image_to_screen(image);
        self.origin + egui::vec2(screen.x as f32, screen.y as f32)
    }

    pub fn rect(&self, rect: &BoxRect) -> egui::Rect {
        egui::Rect::from_min_max(
            self.pos(Point::new(rect.x, rect.y)),
            self.pos(Point::new(rect.right(), rect.bottom())),
        )
    }

    /// Image-space length to screen length.
    pub fn length(&self, image_len: f64) -> f32 {
        (image_len * self.viewport.scale) as f32
    }
}

pub fn paint(painter: &egui::Painter, mapper: &ScreenMapper, metrics: &ScaledMetrics, item: &BoxPaint) {
    let screen_rect = mapper.rect(&item.rect);
    let stroke_width = mapper.length(metrics.stroke_width);
    let stroke_width = if item.selected { stroke_width * 1.5 } else { stroke_width };

    painter.rect_filled(screen_rect, 0.0, item.color.gamma_multiply(0.12));
    painter.rect_stroke(screen_rect, 0.0, egui::Stroke::new(stroke_width, item.color));

    if let Some(text) = item.label {
        paint_label(painter, mapper, metrics, item, text);
    }

    if item.selected {
        let size = mapper.length(metrics.handle_size);
        for handle in Handle::ALL {
            let center = mapper.pos(handle.position(&item.rect));
            let handle_rect = egui::Rect::from_center_size(center, egui::vec2(size, size));
            painter.rect_filled(handle_rect, 1.0, egui::Color32::WHITE);
            painter.rect_stroke(handle_rect, 1.0, egui::Stroke::new(1.0, item.color));
        }
    }

    if let Some(readout) = item.readout {
        let font = egui::FontId::proportional(mapper.length(metrics.font_size));
        let pos = screen_rect.right_bottom() + egui::vec2(4.0, 4.0);
        let galley = painter.layout_no_wrap(readout.to_string(), font, egui::Color32::WHITE);
        let bg = egui::Rect::from_min_size(pos, galley.size()).expand(2.0);
        painter.rect_filled(bg, 2.0, egui::Color32::from_black_alpha(180));
        painter.galley(pos, galley, egui::Color32::WHITE);
    }
}

fn paint_label(
    painter: &egui::Painter,
    mapper: &ScreenMapper,
    metrics: &ScaledMetrics,
    item: &BoxPaint,
    text: &str,
) {
    let origin = mapper.pos(label_origin(&item.rect, metrics));
    let padding = mapper.length(metrics.label_padding);
    let height = mapper.length(metrics.label_height);
    let font = egui::FontId::proportional(mapper.length(metrics.font_size));

    let galley = painter.layout_no_wrap(text.to_string(), font, egui::Color32::WHITE);
    let chip = egui::Rect::from_min_size(origin, egui::vec2(galley.size().x + padding * 2.0, height));
    painter.rect_filled(chip, 2.0, item.color);

    let text_pos = egui::pos2(chip.min.x + padding, chip.center().y - galley.size().y / 2.0);
    painter.galley(text_pos, galley, egui::Color32::WHITE);
}

/// Outline for the rectangle currently being drawn.
pub fn paint_draft(painter: &egui::Painter, mapper: &ScreenMapper, metrics: &ScaledMetrics, rect: &BoxRect) {
    let stroke = egui::Stroke::new(mapper.length(metrics.stroke_width), egui::Color32::LIGHT_BLUE);
    painter.rect_stroke(mapper.rect(rect), 0.0, stroke);
}

pub fn color32(rgb: [u8; 3]) -> egui::Color32 {
    egui::Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}
