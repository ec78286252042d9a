// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! This module describes the project file (labels plus the videos and their
//! extracted frames) and the records exchanged with the annotation store.

use super::annotation::{AnnotationBox, BoxRect, Label};
use crate::util::geometry::{denormalize_rect, normalize_rect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete project description loaded from a project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub videos: Vec<Video>,
}

/// A video whose frames have already been extracted to image files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

/// One extracted frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: String,
    pub frame_number: u32,
    pub image_path: String,
}

impl ProjectData {
    /// Create an empty project.
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            labels: Vec::new(),
            videos: Vec::new(),
        }
    }

    /// Persistence key for a frame of a video in this project.
    pub fn frame_key(&self, video: &Video, frame: &Frame) -> FrameKey {
        FrameKey {
            project_id: self.id.clone(),
            video_id: video.id.clone(),
            frame_id: frame.id.clone(),
        }
    }
}

impl Frame {
    /// Resolve the image path, relative paths being taken from `base_dir`.
    pub fn resolve_image_path(&self, base_dir: &Path) -> PathBuf {
        let path = PathBuf::from(&self.image_path);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }
}

/// Identifies the annotation slot of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameKey {
    pub project_id: String,
    pub video_id: String,
    pub frame_id: String,
}

/// One box in a bulk save request, in normalized [0, 1] fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPayload {
    /// Existing record id, `None` for boxes drawn since the last save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label_id: String,
    pub bbox_x: f64,
    pub bbox_y: f64,
    pub bbox_width: f64,
    pub bbox_height: f64,
}

/// Bulk save body: replaces every annotation of a frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkSaveRequest {
    pub annotations: Vec<AnnotationPayload>,
}

/// An annotation record as stored, with assigned id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAnnotation {
    pub id: String,
    pub label_id: String,
    pub bbox_x: f64,
    pub bbox_y: f64,
    pub bbox_width: f64,
    pub bbox_height: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Id prefix of boxes that have never been saved.
pub const DRAFT_ID_PREFIX: &str = "draft-";

impl BulkSaveRequest {
    /// Build a save body from pixel-space boxes on an image of `width` × `height`.
    pub fn from_boxes(boxes: &[AnnotationBox], width: u32, height: u32) -> Self {
        let annotations = boxes
            .iter()
            .map(|b| {
                let rect = normalize_rect(&b.rect(), width, height);
                AnnotationPayload {
                    id: (!b.id.starts_with(DRAFT_ID_PREFIX)).then(|| b.id.clone()),
                    label_id: b.label_id.clone(),
                    bbox_x: rect.x,
                    bbox_y: rect.y,
                    bbox_width: rect.width,
                    bbox_height: rect.height,
                }
            })
            .collect();
        Self { annotations }
    }
}

impl SavedAnnotation {
    /// Convert a stored record to a pixel-space box.
    ///
    /// Labels missing from `labels` keep their id as name and render gray.
    pub fn to_box(&self, labels: &[Label], width: u32, height: u32) -> AnnotationBox {
        let normalized = BoxRect::new(self.bbox_x, self.bbox_y, self.bbox_width, self.bbox_height);
        let rect = denormalize_rect(&normalized, width, height);
        let label = labels
            .iter()
            .find(|l| l.id == self.label_id)
            .cloned()
            .unwrap_or_else(|| Label {
                id: self.label_id.clone(),
                name: self.label_id.clone(),
                color: "#a0a0a0".to_string(),
                description: None,
            });
        AnnotationBox::new(self.id.clone(), rect, &label)
    }
}

/// Convert every stored record of a frame to pixel-space boxes.
pub fn boxes_from_saved(
    records: &[SavedAnnotation],
    labels: &[Label],
    width: u32,
    height: u32,
) -> Vec<AnnotationBox> {
    records
        .iter()
        .map(|record| record.to_box(labels, width, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> Label {
        Label {
            id: "7".into(),
            name: "person".into(),
            color: "#ff0000".into(),
            description: None,
        }
    }

    #[test]
    fn test_bulk_request_normalizes_and_drops_draft_ids() {
        let boxes = vec![
            AnnotationBox::new("draft-1".into(), BoxRect::new(192.0, 108.0, 384.0, 216.0), &label()),
            AnnotationBox::new("42".into(), BoxRect::new(0.0, 0.0, 960.0, 540.0), &label()),
        ];
        let request = BulkSaveRequest::from_boxes(&boxes, 1920, 1080);
        assert_eq!(request.annotations[0].id, None);
        assert!((request.annotations[0].bbox_x - 0.1).abs() < 1e-9);
        assert!((request.annotations[0].bbox_height - 0.2).abs() < 1e-9);
        assert_eq!(request.annotations[1].id.as_deref(), Some("42"));
        assert_eq!(request.annotations[1].label_id, "7");
    }

    #[test]
    fn test_saved_record_to_box() {
        let now = Utc::now();
        let record = SavedAnnotation {
            id: "9".into(),
            label_id: "missing".into(),
            bbox_x: 0.5,
            bbox_y: 0.5,
            bbox_width: 0.25,
            bbox_height: 0.25,
            created_at: now,
            updated_at: now,
        };
        let b = record.to_box(&[label()], 200, 100);
        assert_eq!(b.rect(), BoxRect::new(100.0, 50.0, 50.0, 25.0));
        assert_eq!(b.label_name, "missing");
        assert_eq!(boxes_from_saved(&[record], &[label()], 200, 100).len(), 1);
    }

    #[test]
    fn test_resolve_relative_image_path() {
        let frame = Frame {
            id: "f1".into(),
            frame_number: 1,
            image_path: "frames/0001.jpg".into(),
        };
        let resolved = frame.resolve_image_path(Path::new("/data/project"));
        assert_eq!(resolved, PathBuf::from("/data/project/frames/0001.jpg"));
    }

    #[test]
    fn test_payload_omits_missing_id() {
        let payload = AnnotationPayload {
            id: None,
            label_id: "3".into(),
            bbox_x: 0.1,
            bbox_y: 0.2,
            bbox_width: 0.3,
            bbox_height: 0.4,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(json.contains("\"bbox_width\":0.3"));
    }
}
