// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! User settings.
//!
//! Settings are stored as YAML in the platform config directory. A missing
//! file means defaults; a broken one is reported and replaced by defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "frame-annotator";
const SETTINGS_FILE: &str = "settings.yaml";

/// Errors raised while reading or writing the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Base sizes of canvas chrome, in screen pixels at scale 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub stroke_width: f64,
    pub label_font_size: f64,
    pub label_height: f64,
    pub label_padding: f64,
    pub handle_size: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_width: 2.0,
            label_font_size: 13.0,
            label_height: 18.0,
            label_padding: 4.0,
            handle_size: 8.0,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of undo snapshots kept per frame
    pub history_limit: usize,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom factor applied per wheel notch
    pub zoom_step: f64,
    /// Show every label (true) or only the selected box's label (false)
    pub show_all_labels: bool,
    /// Root directory of the file-backed annotation store
    pub store_dir: PathBuf,
    pub style: Style,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            min_zoom: 0.1,
            max_zoom: 20.0,
            zoom_step: 1.1,
            show_all_labels: true,
            store_dir: default_store_dir(),
            style: Style::default(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join("annotations"))
        .unwrap_or_else(|| PathBuf::from("annotations"))
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join(APP_DIR).join(SETTINGS_FILE))
        } else {
            dirs::home_dir().map(|home| home.join(".config").join(APP_DIR).join(SETTINGS_FILE))
        }
    }

    /// Parse settings from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load settings from `path`, falling back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No settings file at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path)
            .map_err(ConfigError::from)
            .and_then(|yaml| Self::from_yaml(&yaml))
        {
            Ok(settings) => {
                log::info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                log::warn!("Failed to load settings from {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Load settings from the default location.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => Self::default(),
        }
    }

    /// Write settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        log::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Write settings to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }
}
