// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for frame display and box annotation.
//!
//! Pointer input is forwarded to the controller in canvas-local screen
//! coordinates; the controller owns every gesture. This module only paints
//! what the controller reports.

use crate::editor::bounding_box::label_visible;
use crate::editor::controller::{AnnotationController, InteractionMode, Modifiers};
use crate::models::annotation::{BoxRect, Point};
use crate::ui::bounding_box::{self, BoxPaint, ScreenMapper};

/// Per-canvas state that lives across frames.
#[derive(Debug, Default)]
pub struct CanvasState {
    /// Fit the image on the next frame
    pub needs_fit: bool,
    /// Primary button went down on the canvas and is still held
    pressed: bool,
    last_size: Option<egui::Vec2>,
}

impl CanvasState {
    pub fn request_fit(&mut self) {
        self.needs_fit = true;
        self.pressed = false;
    }
}

/// Display the canvas and route pointer input to the controller.
pub fn show(
    ui: &mut egui::Ui,
    controller: &mut AnnotationController,
    texture: Option<&egui::TextureHandle>,
    state: &mut CanvasState,
) {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
    let origin = rect.min;
    let to_local = |pos: egui::Pos2| Point::new((pos.x - origin.x) as f64, (pos.y - origin.y) as f64);

    if state.needs_fit || state.last_size.is_none() {
        controller.fit_to((rect.width() as f64, rect.height() as f64));
        state.needs_fit = false;
    }
    state.last_size = Some(rect.size());

    handle_pointer(ui, controller, state, &response, to_local);

    if response.hovered() {
        let (scroll, hover) = ui.input(|i| (i.raw_scroll_delta.y, i.pointer.hover_pos()));
        if let Some(pos) = hover {
            if scroll != 0.0 {
                controller.wheel(scroll as f64, to_local(pos));
            }
        }
        let cursor = match controller.mode() {
            InteractionMode::Draw => egui::CursorIcon::Crosshair,
            InteractionMode::Pan if state.pressed => egui::CursorIcon::Grabbing,
            InteractionMode::Pan => egui::CursorIcon::Grab,
            InteractionMode::Select => egui::CursorIcon::Default,
        };
        ui.ctx().set_cursor_icon(cursor);
    }

    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, egui::Color32::from_gray(40));

    let mapper = ScreenMapper {
        origin,
        viewport: controller.viewport(),
    };
    let (image_width, image_height) = controller.image_size();
    let image_rect = mapper.rect(&BoxRect::new(0.0, 0.0, image_width, image_height));

    if let Some(texture) = texture {
        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    } else {
        painter.rect_filled(image_rect, 0.0, egui::Color32::from_gray(60));
    }

    let metrics = controller.metrics();
    let readout = controller.dimension_readout();
    let selected_id = controller.selected_id();

    // Selected box last so its handles sit on top.
    let mut order: Vec<_> = controller.boxes().iter().collect();
    order.sort_by_key(|b| Some(b.id.as_str()) == selected_id);

    for annotation in order {
        let selected = Some(annotation.id.as_str()) == selected_id;
        let item = BoxPaint {
            rect: controller.display_rect(annotation),
            color: bounding_box::color32(annotation.rgb()),
            label: label_visible(selected, controller.show_all_labels()).then_some(annotation.label_name.as_str()),
            selected,
            readout: if selected { readout.as_deref() } else { None },
        };
        bounding_box::paint(&painter, &mapper, &metrics, &item);
    }

    if let Some(draft) = controller.draft_rect() {
        bounding_box::paint_draft(&painter, &mapper, &metrics, &draft);
    }
}

fn handle_pointer(
    ui: &egui::Ui,
    controller: &mut AnnotationController,
    state: &mut CanvasState,
    response: &egui::Response,
    to_local: impl Fn(egui::Pos2) -> Point,
) {
    let (pressed, released, pos, modifiers) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.interact_pos(),
            Modifiers {
                shift: i.modifiers.shift,
            },
        )
    });
    let Some(pos) = pos else {
        return;
    };

    // Press and release can arrive in the same frame (taps, slow frames),
    // so each transition is checked on its own.
    if pressed && response.hovered() {
        if state.pressed {
            controller.pointer_up(to_local(pos), modifiers);
        }
        state.pressed = true;
        controller.pointer_down(to_local(pos), modifiers);
    } else if state.pressed {
        controller.pointer_move(to_local(pos), modifiers);
    }

    if state.pressed && released {
        state.pressed = false;
        controller.pointer_up(to_local(pos), modifiers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::annotation::{AnnotationBox, Label};

    const SCREEN: egui::Vec2 = egui::vec2(800.0, 600.0);

    fn label() -> Label {
        Label {
            id: "1".into(),
            name: "person".into(),
            color: "#ff0000".into(),
            description: None,
        }
    }

    /// 800x600 image on an 800x600 canvas, so screen == image.
    fn controller_with_box() -> AnnotationController {
        let mut c = AnnotationController::new((800, 600), vec![label()], &Settings::default());
        let boxed = AnnotationBox::new("b1".into(), BoxRect::new(100.0, 100.0, 200.0, 150.0), &label());
        c.load((800, 600), vec![boxed]);
        c
    }

    fn run_frame(
        ctx: &egui::Context,
        controller: &mut AnnotationController,
        state: &mut CanvasState,
        events: Vec<egui::Event>,
    ) {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, SCREEN)),
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default()
                .frame(egui::Frame::none())
                .show(ctx, |ui| show(ui, controller, None, state));
        });
    }

    fn moved(x: f32, y: f32) -> egui::Event {
        egui::Event::PointerMoved(egui::pos2(x, y))
    }

    fn button(x: f32, y: f32, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos: egui::pos2(x, y),
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    #[test]
    fn test_tap_in_one_frame_releases_the_box() {
        let ctx = egui::Context::default();
        let mut c = controller_with_box();
        let mut state = CanvasState::default();

        run_frame(&ctx, &mut c, &mut state, vec![moved(200.0, 200.0)]);
        run_frame(
            &ctx,
            &mut c,
            &mut state,
            vec![button(200.0, 200.0, true), button(200.0, 200.0, false)],
        );
        assert!(!state.pressed);
        assert_eq!(c.selected_id(), Some("b1"));

        // Hovering afterwards must not drag the box along.
        run_frame(&ctx, &mut c, &mut state, vec![moved(700.0, 550.0)]);
        let expected = BoxRect::new(100.0, 100.0, 200.0, 150.0);
        assert_eq!(c.display_rect(&c.boxes()[0]), expected);

        run_frame(
            &ctx,
            &mut c,
            &mut state,
            vec![button(700.0, 550.0, true), button(700.0, 550.0, false)],
        );
        assert_eq!(c.boxes()[0].rect(), expected);
        assert!(!c.can_undo());
    }

    #[test]
    fn test_drag_across_frames_commits_on_release() {
        let ctx = egui::Context::default();
        let mut c = controller_with_box();
        let mut state = CanvasState::default();

        run_frame(&ctx, &mut c, &mut state, vec![moved(150.0, 150.0)]);
        run_frame(&ctx, &mut c, &mut state, vec![button(150.0, 150.0, true)]);
        assert!(state.pressed);

        run_frame(&ctx, &mut c, &mut state, vec![moved(250.0, 250.0)]);
        assert_eq!(c.display_rect(&c.boxes()[0]), BoxRect::new(200.0, 200.0, 200.0, 150.0));
        assert_eq!(c.boxes()[0].rect(), BoxRect::new(100.0, 100.0, 200.0, 150.0));
        assert!(!c.can_undo());

        run_frame(&ctx, &mut c, &mut state, vec![button(250.0, 250.0, false)]);
        assert!(!state.pressed);
        assert_eq!(c.boxes()[0].rect(), BoxRect::new(200.0, 200.0, 200.0, 150.0));
        assert!(c.can_undo());
    }
}
