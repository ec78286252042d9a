// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame navigator.
//!
//! Steps through the extracted frames of the current video. Returns the
//! index of the frame to switch to.

use crate::models::project::Video;

pub fn show(ui: &mut egui::Ui, video: &Video, frame_index: usize) -> Option<usize> {
    let count = video.frames.len();
    if count == 0 {
        ui.label(egui::RichText::new("This video has no frames").weak());
        return None;
    }

    let mut target = None;
    ui.horizontal(|ui| {
        if ui.add_enabled(frame_index > 0, egui::Button::new("⏴ Prev (D)")).clicked() {
            target = Some(frame_index - 1);
        }

        let mut position = frame_index + 1;
        let slider = egui::Slider::new(&mut position, 1..=count).text(format!("of {}", count));
        if ui.add(slider).changed() {
            target = Some(position - 1);
        }

        if ui.add_enabled(frame_index + 1 < count, egui::Button::new("Next (F) ⏵")).clicked() {
            target = Some(frame_index + 1);
        }

        ui.separator();
        if let Some(frame) = video.frames.get(frame_index) {
            ui.label(format!("{} · frame #{}", video.name, frame.frame_number));
        }
    });

    target.filter(|&t| t != frame_index && t < count)
}
