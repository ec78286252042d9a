// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with interaction modes, history buttons and save state.

use crate::editor::controller::{AnnotationController, HostRequest, InteractionMode};
use crate::io::store::SaveStatus;

/// Display the toolbar. Returns a request the host must handle.
pub fn show(ui: &mut egui::Ui, controller: &mut AnnotationController, status: &SaveStatus) -> Option<HostRequest> {
    let mut request = None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Mode:");
        ui.separator();

        let mode = controller.mode();
        if ui
            .selectable_label(mode == InteractionMode::Select, "⬆ Select (V)")
            .clicked()
        {
            controller.set_mode(InteractionMode::Select);
        }
        if ui
            .selectable_label(mode == InteractionMode::Draw, "▭ Draw (R)")
            .clicked()
        {
            controller.set_mode(InteractionMode::Draw);
        }
        if controller.is_pan_override() {
            ui.label(egui::RichText::new("✋ Pan").strong());
        }

        ui.separator();

        let mut show_all = controller.show_all_labels();
        if ui.checkbox(&mut show_all, "Labels (H)").changed() {
            controller.toggle_label_visibility();
        }

        ui.separator();

        let undo = ui
            .add_enabled(controller.can_undo(), egui::Button::new("↶ Undo"))
            .on_hover_text(format!("{} steps", controller.undo_depth()));
        if undo.clicked() {
            controller.undo();
        }
        if ui.add_enabled(controller.can_redo(), egui::Button::new("↷ Redo")).clicked() {
            controller.redo();
        }

        ui.separator();

        let saving = matches!(status, SaveStatus::Saving);
        if ui.add_enabled(!saving, egui::Button::new("💾 Save")).clicked() {
            request = Some(HostRequest::Save);
        }

        let (text, color) = match status {
            SaveStatus::Idle => (String::new(), egui::Color32::GRAY),
            SaveStatus::Saving => ("Saving...".to_string(), egui::Color32::LIGHT_BLUE),
            SaveStatus::Saved { count } => (format!("Saved {} boxes", count), egui::Color32::LIGHT_GREEN),
            SaveStatus::Failed(e) => (format!("Save failed: {}", e), egui::Color32::LIGHT_RED),
        };
        if saving {
            ui.spinner();
        }
        ui.label(egui::RichText::new(text).color(color));

        ui.separator();

        let hint = match controller.mode() {
            InteractionMode::Select => "Click to select, drag to move, drag handles to resize (Shift locks aspect)",
            InteractionMode::Draw => "Drag to draw a box, then choose its label",
            InteractionMode::Pan => "Drag to pan",
        };
        ui.label(egui::RichText::new(hint).italics().weak());
    });

    request
}
