// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Dataset export.
//!
//! Saved annotations of every frame in a project are written out as COCO
//! JSON (one document, pixel boxes) or YOLO TXT (one file per frame with
//! normalized center boxes, plus `classes.txt`).

use crate::io::store::AnnotationStore;
use crate::models::project::ProjectData;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

/// Counts reported after an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSummary {
    pub images: usize,
    pub annotations: usize,
    /// Annotations whose label is no longer in the project
    pub skipped: usize,
}

#[derive(Serialize)]
struct CocoDocument {
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
}

#[derive(Serialize)]
struct CocoImage {
    id: usize,
    file_name: String,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct CocoAnnotation {
    id: usize,
    image_id: usize,
    category_id: usize,
    bbox: [f64; 4],
    area: f64,
    iscrowd: u8,
}

#[derive(Serialize)]
struct CocoCategory {
    id: usize,
    name: String,
}

/// Category ids by label id, 1-based in label order.
fn category_ids(project: &ProjectData) -> HashMap<&str, usize> {
    project
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.id.as_str(), i + 1))
        .collect()
}

/// Export every frame's saved boxes to a COCO JSON file.
///
/// Image sizes are read from the frame files under `base_dir`.
pub fn export_coco(
    project: &ProjectData,
    store: &dyn AnnotationStore,
    base_dir: &Path,
    path: &Path,
) -> Result<ExportSummary> {
    let categories = category_ids(project);
    let mut document = CocoDocument {
        images: Vec::new(),
        annotations: Vec::new(),
        categories: project
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| CocoCategory {
                id: i + 1,
                name: label.name.clone(),
            })
            .collect(),
    };
    let mut summary = ExportSummary::default();

    for video in &project.videos {
        for frame in &video.frames {
            let image_path = frame.resolve_image_path(base_dir);
            let (width, height) = image::image_dimensions(&image_path)
                .with_context(|| format!("Failed to read size of {}", image_path.display()))?;
            let image_id = document.images.len() + 1;
            document.images.push(CocoImage {
                id: image_id,
                file_name: frame.image_path.clone(),
                width,
                height,
            });

            let records = store.load_frame(&project.frame_key(video, frame))?;
            for record in records {
                let Some(&category_id) = categories.get(record.label_id.as_str()) else {
                    summary.skipped += 1;
                    continue;
                };
                let w = record.bbox_width * width as f64;
                let h = record.bbox_height * height as f64;
                document.annotations.push(CocoAnnotation {
                    id: document.annotations.len() + 1,
                    image_id,
                    category_id,
                    bbox: [record.bbox_x * width as f64, record.bbox_y * height as f64, w, h],
                    area: w * h,
                    iscrowd: 0,
                });
            }
        }
    }

    summary.images = document.images.len();
    summary.annotations = document.annotations.len();
    std::fs::write(path, serde_json::to_string_pretty(&document)?)?;
    log::info!(
        "Exported {} images with {} annotations to {}",
        summary.images,
        summary.annotations,
        path.display()
    );
    Ok(summary)
}

/// Export every frame's saved boxes as YOLO label files into `out_dir`.
pub fn export_yolo(
    project: &ProjectData,
    store: &dyn AnnotationStore,
    out_dir: &Path,
) -> Result<ExportSummary> {
    std::fs::create_dir_all(out_dir)?;
    let classes: String = project.labels.iter().map(|l| format!("{}\n", l.name)).collect();
    std::fs::write(out_dir.join("classes.txt"), classes)?;

    let categories = category_ids(project);
    let mut summary = ExportSummary::default();

    for video in &project.videos {
        for frame in &video.frames {
            let records = store.load_frame(&project.frame_key(video, frame))?;
            let mut lines = String::new();
            for record in records {
                let Some(&category_id) = categories.get(record.label_id.as_str()) else {
                    summary.skipped += 1;
                    continue;
                };
                let cx = record.bbox_x + record.bbox_width / 2.0;
                let cy = record.bbox_y + record.bbox_height / 2.0;
                writeln!(
                    lines,
                    "{} {:.6} {:.6} {:.6} {:.6}",
                    category_id - 1,
                    cx,
                    cy,
                    record.bbox_width,
                    record.bbox_height
                )?;
                summary.annotations += 1;
            }
            let file_name = format!("{}_{}.txt", video.id, frame.id);
            std::fs::write(out_dir.join(file_name), lines)?;
            summary.images += 1;
        }
    }

    log::info!(
        "Exported {} YOLO label files ({} boxes) to {}",
        summary.images,
        summary.annotations,
        out_dir.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::JsonFileStore;
    use crate::models::annotation::Label;
    use crate::models::project::{AnnotationPayload, BulkSaveRequest, Frame, Video};

    fn project() -> ProjectData {
        let mut project = ProjectData::new("p1".into(), "Traffic".into());
        project.labels = vec![
            Label {
                id: "a".into(),
                name: "car".into(),
                color: "#ff0000".into(),
                description: None,
            },
            Label {
                id: "b".into(),
                name: "person".into(),
                color: "#00ff00".into(),
                description: None,
            },
        ];
        project.videos = vec![Video {
            id: "v1".into(),
            name: "clip".into(),
            frames: vec![Frame {
                id: "f1".into(),
                frame_number: 1,
                image_path: "f1.png".into(),
            }],
        }];
        project
    }

    fn seeded_store(root: &Path, project: &ProjectData) -> JsonFileStore {
        let store = JsonFileStore::new(root);
        let key = project.frame_key(&project.videos[0], &project.videos[0].frames[0]);
        let box_for = |label_id: &str| AnnotationPayload {
            id: None,
            label_id: label_id.into(),
            bbox_x: 0.25,
            bbox_y: 0.5,
            bbox_width: 0.5,
            bbox_height: 0.25,
        };
        store
            .bulk_save(
                &key,
                &BulkSaveRequest {
                    annotations: vec![box_for("b"), box_for("gone")],
                },
            )
            .unwrap();
        store
    }

    #[test]
    fn test_coco_export_uses_pixel_boxes() {
        let dir = tempfile::tempdir().unwrap();
        let project = project();
        image::RgbaImage::new(200, 100).save(dir.path().join("f1.png")).unwrap();
        let store = seeded_store(&dir.path().join("store"), &project);

        let out = dir.path().join("coco.json");
        let summary = export_coco(&project, &store, dir.path(), &out).unwrap();
        assert_eq!(
            summary,
            ExportSummary {
                images: 1,
                annotations: 1,
                skipped: 1
            }
        );

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["images"][0]["width"], 200);
        assert_eq!(json["annotations"][0]["category_id"], 2);
        assert_eq!(json["annotations"][0]["bbox"][0], 50.0);
        assert_eq!(json["annotations"][0]["bbox"][3], 25.0);
        assert_eq!(json["categories"][1]["name"], "person");
    }

    #[test]
    fn test_yolo_export_writes_center_boxes() {
        let dir = tempfile::tempdir().unwrap();
        let project = project();
        let store = seeded_store(&dir.path().join("store"), &project);

        let out = dir.path().join("yolo");
        let summary = export_yolo(&project, &store, &out).unwrap();
        assert_eq!(summary.annotations, 1);
        assert_eq!(std::fs::read_to_string(out.join("classes.txt")).unwrap(), "car\nperson\n");
        assert_eq!(
            std::fs::read_to_string(out.join("v1_f1.txt")).unwrap(),
            "1 0.500000 0.625000 0.500000 0.250000\n"
        );
    }
}
