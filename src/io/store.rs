// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation persistence.
//!
//! The editor talks to storage through the `AnnotationStore` trait: load the
//! records of a frame, or replace them in bulk. `JsonFileStore` keeps one
//! JSON document per frame. `SaveCoordinator` runs saves on a background
//! thread and never lets two saves run at once.

use crate::models::project::{BulkSaveRequest, FrameKey, SavedAnnotation};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised by annotation stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid frame key component: {0:?}")]
    InvalidKey(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Persistence collaborator for frame annotations.
pub trait AnnotationStore: Send + Sync {
    /// Stored records of a frame; empty if nothing was saved yet.
    fn load_frame(&self, key: &FrameKey) -> Result<Vec<SavedAnnotation>, StoreError>;

    /// Replace all records of a frame and return what was stored.
    fn bulk_save(
        &self,
        key: &FrameKey,
        request: &BulkSaveRequest,
    ) -> Result<Vec<SavedAnnotation>, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FrameDocument {
    annotations: Vec<SavedAnnotation>,
}

/// File-backed store: `<root>/<project>/<video>/<frame>.json`.
pub struct JsonFileStore {
    root: PathBuf,
    next_id: AtomicU64,
    /// Serialises read-modify-write cycles on frame files
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let seed = Utc::now().timestamp_micros().max(1) as u64;
        Self {
            root,
            next_id: AtomicU64::new(seed),
            write_lock: Mutex::new(()),
        }
    }

    fn frame_path(&self, key: &FrameKey) -> Result<PathBuf, StoreError> {
        for part in [&key.project_id, &key.video_id, &key.frame_id] {
            let valid = !part.is_empty()
                && part != "."
                && part != ".."
                && !part.contains(['/', '\\']);
            if !valid {
                return Err(StoreError::InvalidKey(part.clone()));
            }
        }
        Ok(self
            .root
            .join(&key.project_id)
            .join(&key.video_id)
            .join(format!("{}.json", key.frame_id)))
    }

    fn read_document(path: &Path) -> Result<FrameDocument, StoreError> {
        if !path.exists() {
            return Ok(FrameDocument::default());
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl AnnotationStore for JsonFileStore {
    fn load_frame(&self, key: &FrameKey) -> Result<Vec<SavedAnnotation>, StoreError> {
        let path = self.frame_path(key)?;
        Ok(Self::read_document(&path)?.annotations)
    }

    fn bulk_save(
        &self,
        key: &FrameKey,
        request: &BulkSaveRequest,
    ) -> Result<Vec<SavedAnnotation>, StoreError> {
        let path = self.frame_path(key)?;
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let existing = Self::read_document(&path)?.annotations;
        let now = Utc::now();
        let annotations: Vec<SavedAnnotation> = request
            .annotations
            .iter()
            .map(|payload| {
                let previous = payload
                    .id
                    .as_ref()
                    .and_then(|id| existing.iter().find(|a| &a.id == id));
                let id = match previous {
                    Some(p) => p.id.clone(),
                    None => self.next_id.fetch_add(1, Ordering::Relaxed).to_string(),
                };
                SavedAnnotation {
                    id,
                    label_id: payload.label_id.clone(),
                    bbox_x: payload.bbox_x,
                    bbox_y: payload.bbox_y,
                    bbox_width: payload.bbox_width,
                    bbox_height: payload.bbox_height,
                    created_at: previous.map(|p| p.created_at).unwrap_or(now),
                    updated_at: now,
                }
            })
            .collect();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let document = FrameDocument { annotations };
        std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
        log::info!(
            "Stored {} annotations for frame {} in {}",
            document.annotations.len(),
            key.frame_id,
            path.display()
        );
        Ok(document.annotations)
    }
}

/// Result of asking the coordinator to save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDispatch {
    Started,
    /// A save is outstanding; nothing was sent
    AlreadyInFlight,
}

/// Save state shown in the status line.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved { count: usize },
    Failed(String),
}

/// Completed save, delivered by `SaveCoordinator::poll`.
#[derive(Debug)]
pub struct SaveCompletion {
    pub key: FrameKey,
    /// Controller revision the request was built from
    pub revision: u64,
    pub result: Result<Vec<SavedAnnotation>, StoreError>,
}

/// Runs saves in the background, at most one at a time.
pub struct SaveCoordinator {
    store: Arc<dyn AnnotationStore>,
    in_flight: Option<Receiver<SaveCompletion>>,
    status: SaveStatus,
}

impl SaveCoordinator {
    pub fn new(store: Arc<dyn AnnotationStore>) -> Self {
        Self {
            store,
            in_flight: None,
            status: SaveStatus::Idle,
        }
    }

    pub fn store(&self) -> &Arc<dyn AnnotationStore> {
        &self.store
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a save unless one is already outstanding.
    pub fn request_save(&mut self, key: FrameKey, revision: u64, request: BulkSaveRequest) -> SaveDispatch {
        if self.in_flight.is_some() {
            log::warn!("Save for frame {} ignored, previous save still running", key.frame_id);
            return SaveDispatch::AlreadyInFlight;
        }

        let (sender, receiver) = channel();
        self.in_flight = Some(receiver);
        self.status = SaveStatus::Saving;

        let store = Arc::clone(&self.store);
        std::thread::spawn(move || {
            let result = store.bulk_save(&key, &request);
            let _ = sender.send(SaveCompletion {
                key,
                revision,
                result,
            });
        });
        SaveDispatch::Started
    }

    /// Collect a finished save, if any. Call once per UI frame.
    pub fn poll(&mut self) -> Option<SaveCompletion> {
        let receiver = self.in_flight.as_ref()?;
        let completion = match receiver.try_recv() {
            Ok(completion) => completion,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                self.in_flight = None;
                self.status = SaveStatus::Failed("save worker exited unexpectedly".to_string());
                log::error!("Save worker exited without reporting");
                return None;
            }
        };
        self.in_flight = None;
        self.status = match &completion.result {
            Ok(records) => SaveStatus::Saved {
                count: records.len(),
            },
            Err(e) => {
                log::error!("Failed to save frame {}: {}", completion.key.frame_id, e);
                SaveStatus::Failed(e.to_string())
            }
        };
        Some(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::AnnotationPayload;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn key(frame: &str) -> FrameKey {
        FrameKey {
            project_id: "p1".into(),
            video_id: "v1".into(),
            frame_id: frame.into(),
        }
    }

    fn payload(id: Option<&str>, x: f64) -> AnnotationPayload {
        AnnotationPayload {
            id: id.map(str::to_string),
            label_id: "1".into(),
            bbox_x: x,
            bbox_y: 0.1,
            bbox_width: 0.2,
            bbox_height: 0.2,
        }
    }

    fn wait_for(coordinator: &mut SaveCoordinator) -> SaveCompletion {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(completion) = coordinator.poll() {
                return completion;
            }
            assert!(Instant::now() < deadline, "save did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Store whose saves block until released, counting calls.
    struct GatedStore {
        calls: AtomicUsize,
        gate: Mutex<Receiver<()>>,
        fail: bool,
    }

    impl AnnotationStore for GatedStore {
        fn load_frame(&self, _key: &FrameKey) -> Result<Vec<SavedAnnotation>, StoreError> {
            Ok(Vec::new())
        }

        fn bulk_save(
            &self,
            _key: &FrameKey,
            request: &BulkSaveRequest,
        ) -> Result<Vec<SavedAnnotation>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.gate.lock().map_err(|_| StoreError::Poisoned)?.recv();
            if self.fail {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            let now = Utc::now();
            Ok(request
                .annotations
                .iter()
                .enumerate()
                .map(|(i, p)| SavedAnnotation {
                    id: i.to_string(),
                    label_id: p.label_id.clone(),
                    bbox_x: p.bbox_x,
                    bbox_y: p.bbox_y,
                    bbox_width: p.bbox_width,
                    bbox_height: p.bbox_height,
                    created_at: now,
                    updated_at: now,
                })
                .collect())
        }
    }

    fn gated(fail: bool) -> (Arc<GatedStore>, std::sync::mpsc::Sender<()>) {
        let (release, gate) = channel();
        let store = Arc::new(GatedStore {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(gate),
            fail,
        });
        (store, release)
    }

    #[test]
    fn test_second_save_while_in_flight_is_rejected() {
        let (store, release) = gated(false);
        let mut coordinator = SaveCoordinator::new(store.clone());
        let request = BulkSaveRequest {
            annotations: vec![payload(None, 0.1)],
        };

        assert_eq!(coordinator.request_save(key("f1"), 1, request.clone()), SaveDispatch::Started);
        assert_eq!(
            coordinator.request_save(key("f1"), 1, request.clone()),
            SaveDispatch::AlreadyInFlight
        );
        assert_eq!(coordinator.status(), &SaveStatus::Saving);

        release.send(()).unwrap();
        let completion = wait_for(&mut coordinator);
        assert_eq!(completion.revision, 1);
        assert_eq!(completion.result.unwrap().len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.status(), &SaveStatus::Saved { count: 1 });
        assert!(!coordinator.is_saving());
    }

    #[test]
    fn test_failed_save_reports_and_allows_retry() {
        let (store, release) = gated(true);
        let mut coordinator = SaveCoordinator::new(store.clone());
        coordinator.request_save(key("f1"), 3, BulkSaveRequest::default());
        release.send(()).unwrap();
        let completion = wait_for(&mut coordinator);
        assert!(completion.result.is_err());
        assert!(matches!(coordinator.status(), SaveStatus::Failed(msg) if msg.contains("disk full")));

        assert_eq!(
            coordinator.request_save(key("f1"), 3, BulkSaveRequest::default()),
            SaveDispatch::Started
        );
        release.send(()).unwrap();
        wait_for(&mut coordinator);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_file_store_assigns_and_keeps_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_frame(&key("f1")).unwrap().is_empty());

        let first = store
            .bulk_save(
                &key("f1"),
                &BulkSaveRequest {
                    annotations: vec![payload(None, 0.1), payload(None, 0.5)],
                },
            )
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_ne!(first[0].id, first[1].id);

        // Keep the first record, drop the second, add a new one
        let second = store
            .bulk_save(
                &key("f1"),
                &BulkSaveRequest {
                    annotations: vec![payload(Some(&first[0].id), 0.3), payload(None, 0.7)],
                },
            )
            .unwrap();
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].created_at, first[0].created_at);
        assert_eq!(second[0].bbox_x, 0.3);
        assert!(second.iter().all(|a| a.id != first[1].id));

        let loaded = store.load_frame(&key("f1")).unwrap();
        let loaded_ids: Vec<&str> = loaded.iter().map(|a| a.id.as_str()).collect();
        let saved_ids: Vec<&str> = second.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(loaded_ids, saved_ids);
        assert!((loaded[1].bbox_x - 0.7).abs() < 1e-12);
        assert!(dir.path().join("p1").join("v1").join("f1.json").exists());
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(
            store.load_frame(&key("../escape")),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.load_frame(&key("")), Err(StoreError::InvalidKey(_))));
    }
}
