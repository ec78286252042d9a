// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame Annotator
//!
//! A cross-platform desktop application for drawing and labeling bounding
//! boxes on extracted video frames.

mod app;
mod config;
mod editor;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::AnnotatorApp;
use config::Settings;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let settings = Settings::load();
    let project_path = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Frame Annotator"),
        ..Default::default()
    };

    eframe::run_native(
        "Frame Annotator",
        options,
        Box::new(|_cc| Ok(Box::new(AnnotatorApp::new(settings, project_path)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
