// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame image loading.
//!
//! This module decodes extracted frame images into RGBA pixels suitable for
//! an egui texture. The natural size of the image seeds canvas clamping.

use anyhow::{Context, Result};
use std::path::Path;

/// A decoded frame image.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    /// Unmultiplied RGBA8 pixels, row major
    pub pixels: Vec<u8>,
}

/// Decode an image file to RGBA.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let img = image::open(path).with_context(|| format!("Failed to decode {}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        anyhow::bail!("Image {} is empty", path.display());
    }
    Ok(LoadedImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_png_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::RgbaImage::from_pixel(64, 36, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!((loaded.width, loaded.height), (64, 36));
        assert_eq!(loaded.pixels.len(), 64 * 36 * 4);
        assert_eq!(&loaded.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_image(Path::new("/nonexistent/frame.png")).is_err());
    }
}
