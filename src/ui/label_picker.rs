// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Modal window for choosing the label of a freshly drawn box.

use crate::editor::controller::AnnotationController;
use crate::editor::label_picker::MAX_ORDINAL;
use crate::ui::bounding_box::color32;

/// Result of picker interaction this frame.
pub enum PickerAction {
    None,
    Pick(String),
    Cancel,
}

/// Show the picker while it is open.
///
/// Number keys are handled by the keyboard layer, so digits typed while the
/// search field has focus are removed before the field sees them.
pub fn show(ctx: &egui::Context, controller: &mut AnnotationController) -> PickerAction {
    if !controller.picker().is_open() {
        return PickerAction::None;
    }

    ctx.input_mut(|i| {
        i.events
            .retain(|e| !matches!(e, egui::Event::Text(t) if t.chars().all(|c| c.is_ascii_digit())))
    });

    let mut action = PickerAction::None;

    egui::Window::new("Assign label")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            let search = ui.add(
                egui::TextEdit::singleline(controller.picker_mut().query_mut())
                    .hint_text("Search labels...")
                    .desired_width(240.0),
            );
            search.request_focus();
            ui.add_space(4.0);

            let filtered = controller.picker().filtered();
            egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
                if filtered.is_empty() {
                    ui.label(egui::RichText::new("No matching labels").weak());
                }
                for (index, label) in filtered.iter().enumerate() {
                    ui.horizontal(|ui| {
                        let (swatch, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                        ui.painter().rect_filled(swatch, 2.0, color32(label.rgb()));

                        let text = if index < MAX_ORDINAL {
                            format!("{}  {}", index + 1, label.name)
                        } else {
                            format!("    {}", label.name)
                        };
                        let button = ui.selectable_label(false, text);
                        let button = match &label.description {
                            Some(description) => button.on_hover_text(description),
                            None => button,
                        };
                        if button.clicked() {
                            action = PickerAction::Pick(label.id.clone());
                        }
                    });
                }
            });

            ui.separator();
            if ui.button("Cancel").clicked() {
                action = PickerAction::Cancel;
            }
        });

    match &action {
        PickerAction::Pick(id) => controller.picker_pick(id),
        PickerAction::Cancel => controller.picker_cancel(),
        PickerAction::None => {}
    }
    action
}
