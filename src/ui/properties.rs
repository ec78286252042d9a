// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Box list and label panel.
//!
//! Lists the boxes of the current frame and lets the selected box be
//! relabeled or deleted. The project's labels are shown with their quick
//! label number.

use crate::editor::controller::AnnotationController;
use crate::editor::label_picker::MAX_ORDINAL;
use crate::ui::bounding_box::color32;

pub fn show(ui: &mut egui::Ui, controller: &mut AnnotationController) {
    ui.heading("Boxes");
    ui.separator();

    let mut select = None;
    let selected_id = controller.selected_id().map(str::to_string);

    egui::ScrollArea::vertical()
        .id_source("box_list")
        .max_height(ui.available_height() * 0.5)
        .show(ui, |ui| {
            if controller.boxes().is_empty() {
                ui.label(egui::RichText::new("No boxes on this frame").weak());
            }
            for annotation in controller.boxes() {
                let is_selected = selected_id.as_deref() == Some(annotation.id.as_str());
                ui.horizontal(|ui| {
                    let (swatch, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                    ui.painter().rect_filled(swatch, 2.0, color32(annotation.rgb()));
                    let text = format!(
                        "{}  {:.0}×{:.0} @ ({:.0}, {:.0})",
                        annotation.label_name, annotation.width, annotation.height, annotation.x, annotation.y
                    );
                    if ui.selectable_label(is_selected, text).clicked() {
                        select = Some(annotation.id.clone());
                    }
                });
            }
        });

    if let Some(id) = select {
        controller.select(Some(id));
    }

    if let Some(selected) = controller.selected_box().cloned() {
        ui.separator();
        ui.label(egui::RichText::new("Selected").strong());

        let mut relabel = None;
        egui::ComboBox::from_label("Label")
            .selected_text(selected.label_name.as_str())
            .show_ui(ui, |ui| {
                for label in controller.labels() {
                    if ui.selectable_label(label.id == selected.label_id, &label.name).clicked() {
                        relabel = Some(label.clone());
                    }
                }
            });
        if let Some(label) = relabel {
            controller.assign_label(&selected.id, &label);
        }

        if ui.button("🗑 Delete").clicked() {
            controller.delete_selected();
        }
    }

    ui.separator();
    ui.heading("Labels");
    for (index, label) in controller.labels().iter().enumerate() {
        ui.horizontal(|ui| {
            let (swatch, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
            ui.painter().rect_filled(swatch, 2.0, color32(label.rgb()));
            let key = if index < MAX_ORDINAL {
                format!("{}", index + 1)
            } else {
                " ".to_string()
            };
            let response = ui.label(format!("{}  {}", key, label.name));
            if let Some(description) = &label.description {
                response.on_hover_text(description);
            }
        });
    }
}
