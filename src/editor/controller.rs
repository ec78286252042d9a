// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation canvas controller.
//!
//! The controller owns the canonical list of boxes for the current frame.
//! Pointer and keyboard input arrive as plain values; box primitives and
//! the label picker report back through events. Every committed change goes
//! through this type, which records an undo snapshot and bumps a revision
//! counter used to detect stale save acknowledgments.

use crate::config::{Settings, Style};
use crate::editor::bounding_box::{BoxEvent, BoxInteraction};
use crate::editor::commands::Command;
use crate::editor::history::History;
use crate::editor::label_picker::{LabelPicker, PickerOutcome};
use crate::editor::selection::{cycle_selection, hit_test, CycleDirection};
use crate::editor::viewport::Viewport;
use crate::models::annotation::{AnnotationBox, BoxRect, Label, Point};
use crate::models::project::{
    boxes_from_saved, BulkSaveRequest, SavedAnnotation, DRAFT_ID_PREFIX,
};
use crate::util::geometry::{clamp_point, clamp_size, rect_from_corners, ScaledMetrics, MIN_SIZE};

/// Current canvas interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Select,
    Draw,
    Pan,
}

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Locks the aspect ratio while resizing
    pub shift: bool,
}

/// Requests the controller cannot satisfy on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    PreviousFrame,
    NextFrame,
    Save,
}

/// A save body together with the revision it was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSnapshot {
    pub revision: u64,
    pub request: BulkSaveRequest,
}

/// Save acknowledgment held back until the running box gesture ends.
#[derive(Debug, Clone)]
struct DeferredAck {
    /// Box ids in the order the save body listed them
    ids: Vec<String>,
    records: Vec<SavedAnnotation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerState {
    Idle,
    Drawing { anchor: Point, current: Point },
    Panning { last: Point },
    BoxGesture,
}

pub struct AnnotationController {
    image_size: (u32, u32),
    labels: Vec<Label>,
    boxes: Vec<AnnotationBox>,
    selected: Option<String>,
    /// Live state of the selected or dragged box
    interaction: Option<BoxInteraction>,
    mode: InteractionMode,
    /// Mode to restore when the transient pan ends
    pan_restore: Option<InteractionMode>,
    pointer: PointerState,
    /// Last pointer position in image space
    last_pointer: Option<Point>,
    picker: LabelPicker,
    history: History,
    show_all_labels: bool,
    viewport: Viewport,
    style: Style,
    min_zoom: f64,
    max_zoom: f64,
    zoom_step: f64,
    revision: u64,
    next_draft: u64,
    deferred_ack: Option<DeferredAck>,
}

impl AnnotationController {
    pub fn new(image_size: (u32, u32), labels: Vec<Label>, settings: &Settings) -> Self {
        Self {
            image_size,
            picker: LabelPicker::new(labels.clone()),
            labels,
            boxes: Vec::new(),
            selected: None,
            interaction: None,
            mode: InteractionMode::Select,
            pan_restore: None,
            pointer: PointerState::Idle,
            last_pointer: None,
            history: History::new(settings.history_limit),
            show_all_labels: settings.show_all_labels,
            viewport: Viewport::default(),
            style: settings.style.clone(),
            min_zoom: settings.min_zoom,
            max_zoom: settings.max_zoom,
            zoom_step: settings.zoom_step,
            revision: 0,
            next_draft: 1,
            deferred_ack: None,
        }
    }

    /// Replace the canonical list wholesale, as on frame navigation.
    ///
    /// History, selection and any gesture in progress are discarded. The
    /// mode and label visibility carry over.
    pub fn load(&mut self, image_size: (u32, u32), boxes: Vec<AnnotationBox>) {
        self.image_size = image_size;
        self.boxes = boxes;
        self.selected = None;
        self.interaction = None;
        self.pointer = PointerState::Idle;
        self.picker.cancel();
        self.history.clear();
        self.deferred_ack = None;
        self.revision += 1;
        log::info!("Loaded {} boxes on {}x{} image", self.boxes.len(), image_size.0, image_size.1);
    }

    pub fn set_labels(&mut self, labels: Vec<Label>) {
        self.picker.set_labels(labels.clone());
        self.labels = labels;
    }

    // ----------------------------------------------------------------------
    // Read access for rendering
    // ----------------------------------------------------------------------

    pub fn boxes(&self) -> &[AnnotationBox] {
        &self.boxes
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn image_size(&self) -> (f64, f64) {
        (self.image_size.0 as f64, self.image_size.1 as f64)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_box(&self) -> Option<&AnnotationBox> {
        let id = self.selected.as_deref()?;
        self.boxes.iter().find(|b| b.id == id)
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn is_pan_override(&self) -> bool {
        self.pan_restore.is_some()
    }

    pub fn show_all_labels(&self) -> bool {
        self.show_all_labels
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn metrics(&self) -> ScaledMetrics {
        ScaledMetrics::for_scale(self.viewport.scale, &self.style)
    }

    pub fn picker(&self) -> &LabelPicker {
        &self.picker
    }

    /// Picker access for its search field.
    pub fn picker_mut(&mut self) -> &mut LabelPicker {
        &mut self.picker
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of steps undo can go back.
    pub fn undo_depth(&self) -> usize {
        self.history.undo_count()
    }

    /// Geometry to draw for a box: live while it is being interacted with.
    pub fn display_rect(&self, annotation: &AnnotationBox) -> BoxRect {
        match &self.interaction {
            Some(interaction) if interaction.id() == annotation.id => interaction.live(),
            _ => annotation.rect(),
        }
    }

    /// Width × height text of the box being resized, if any.
    pub fn dimension_readout(&self) -> Option<String> {
        self.interaction.as_ref()?.dimension_readout()
    }

    /// Rectangle being drawn, while the pointer is down in draw mode.
    pub fn draft_rect(&self) -> Option<BoxRect> {
        match self.pointer {
            PointerState::Drawing { anchor, current } => Some(rect_from_corners(anchor, current)),
            _ => None,
        }
    }

    // ----------------------------------------------------------------------
    // Viewport
    // ----------------------------------------------------------------------

    /// Fit the image into a canvas of the given screen size.
    pub fn fit_to(&mut self, canvas_size: (f64, f64)) {
        self.viewport = Viewport::fit(self.image_size(), canvas_size);
    }

    /// Zoom one wheel step around `cursor` (screen space).
    pub fn wheel(&mut self, delta: f64, cursor: Point) {
        if delta == 0.0 {
            return;
        }
        let factor = if delta > 0.0 { self.zoom_step } else { 1.0 / self.zoom_step };
        let scale = (self.viewport.scale * factor).clamp(self.min_zoom, self.max_zoom);
        self.viewport.zoom_at(scale, cursor);
    }

    // ----------------------------------------------------------------------
    // Modes
    // ----------------------------------------------------------------------

    pub fn set_mode(&mut self, mode: InteractionMode) {
        if self.pan_restore.is_some() {
            self.pan_restore = Some(mode);
            return;
        }
        if mode != self.mode {
            self.abort_pointer();
            log::debug!("Mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Switch between select and draw.
    pub fn toggle_mode(&mut self) {
        let base = self.pan_restore.unwrap_or(self.mode);
        let next = match base {
            InteractionMode::Select => InteractionMode::Draw,
            InteractionMode::Draw | InteractionMode::Pan => InteractionMode::Select,
        };
        self.set_mode(next);
    }

    /// Back to select mode with nothing selected.
    pub fn escape(&mut self) {
        if self.picker.is_open() {
            self.picker_cancel();
        }
        self.abort_pointer();
        if self.pan_restore.is_some() {
            self.pan_restore = Some(InteractionMode::Select);
        } else {
            self.mode = InteractionMode::Select;
        }
        self.select(None);
    }

    /// Enter the transient pan mode. Repeated calls are ignored.
    pub fn begin_pan_override(&mut self) {
        if self.pan_restore.is_some() {
            return;
        }
        self.abort_pointer();
        self.pan_restore = Some(self.mode);
        self.mode = InteractionMode::Pan;
    }

    /// Leave the transient pan mode and restore the previous mode.
    pub fn end_pan_override(&mut self) {
        if let Some(previous) = self.pan_restore.take() {
            self.abort_pointer();
            self.mode = previous;
        }
    }

    pub fn toggle_label_visibility(&mut self) {
        self.show_all_labels = !self.show_all_labels;
    }

    // ----------------------------------------------------------------------
    // Pointer input (canvas-local screen coordinates)
    // ----------------------------------------------------------------------

    pub fn pointer_down(&mut self, screen: Point, modifiers: Modifiers) {
        if self.picker.is_open() {
            return;
        }
        let image = self.viewport.screen_to_image(screen);
        self.last_pointer = Some(image);

        match self.mode {
            InteractionMode::Pan => self.pointer = PointerState::Panning { last: screen },
            InteractionMode::Draw => {
                let (iw, ih) = self.image_size();
                let anchor = clamp_point(image, iw, ih);
                self.pointer = PointerState::Drawing {
                    anchor,
                    current: anchor,
                };
            }
            InteractionMode::Select => self.select_pointer_down(image, modifiers),
        }
    }

    fn select_pointer_down(&mut self, image: Point, _modifiers: Modifiers) {
        let metrics = self.metrics();
        if let Some(interaction) = self.interaction.as_mut() {
            if self.selected.as_deref() == Some(interaction.id()) {
                if let Some(handle) = interaction.handle_at(image, &metrics) {
                    let event = interaction.begin_transform(handle);
                    self.pointer = PointerState::BoxGesture;
                    self.handle_box_event(event);
                    return;
                }
            }
        }

        match hit_test(&self.boxes, image) {
            Some(hit) => {
                let reuse = self.interaction.as_ref().is_some_and(|i| i.id() == hit.id);
                if !reuse {
                    self.interaction = Some(BoxInteraction::new(hit));
                }
                if let Some(interaction) = self.interaction.as_mut() {
                    interaction.begin_drag(image);
                }
                self.pointer = PointerState::BoxGesture;
            }
            None => self.select(None),
        }
    }

    pub fn pointer_move(&mut self, screen: Point, modifiers: Modifiers) {
        let image = self.viewport.screen_to_image(screen);
        self.last_pointer = Some(image);
        let image_size = self.image_size();

        match self.pointer {
            PointerState::Idle => {}
            PointerState::Panning { last } => {
                self.viewport.pan_by(screen.x - last.x, screen.y - last.y);
                self.pointer = PointerState::Panning { last: screen };
            }
            PointerState::Drawing { anchor, .. } => {
                self.pointer = PointerState::Drawing {
                    anchor,
                    current: clamp_point(image, image_size.0, image_size.1),
                };
            }
            PointerState::BoxGesture => {
                let Some(interaction) = self.interaction.as_mut() else {
                    return;
                };
                if interaction.is_transforming() {
                    interaction.transform_to(image, modifiers.shift, image_size);
                } else if let Some(event) = interaction.drag_to(image, image_size) {
                    self.handle_box_event(event);
                }
            }
        }
    }

    pub fn pointer_up(&mut self, screen: Point, modifiers: Modifiers) {
        self.pointer_move(screen, modifiers);
        let image_size = self.image_size();

        match std::mem::replace(&mut self.pointer, PointerState::Idle) {
            PointerState::Idle | PointerState::Panning { .. } => {}
            PointerState::Drawing { anchor, current } => {
                self.finish_draw(rect_from_corners(anchor, current));
            }
            PointerState::BoxGesture => {
                let event = self.interaction.as_mut().and_then(|interaction| {
                    if interaction.is_transforming() {
                        interaction.end_transform(image_size)
                    } else {
                        interaction.end_drag(image_size)
                    }
                });
                if let Some(event) = event {
                    self.handle_box_event(event);
                }
                self.reattach_interaction();
                self.adopt_deferred_ack();
            }
        }
    }

    /// Drop any in-progress pointer gesture without committing it.
    fn abort_pointer(&mut self) {
        if self.pointer == PointerState::BoxGesture {
            if let Some(interaction) = self.interaction.as_mut() {
                interaction.cancel();
            }
            self.pointer = PointerState::Idle;
            self.reattach_interaction();
            self.adopt_deferred_ack();
        }
        self.pointer = PointerState::Idle;
    }

    fn handle_box_event(&mut self, event: BoxEvent) {
        match event {
            BoxEvent::Select(id) | BoxEvent::DragStart(id) => self.select(Some(id)),
            BoxEvent::TransformStart(id) => log::debug!("Transform started on {}", id),
            BoxEvent::DragEnd { id, rect } | BoxEvent::TransformEnd { id, rect } => {
                self.commit_geometry(&id, rect)
            }
        }
    }

    // ----------------------------------------------------------------------
    // Selection
    // ----------------------------------------------------------------------

    /// Select a box (or nothing). The resize affordance follows the selection.
    pub fn select(&mut self, id: Option<String>) {
        let id = id.filter(|id| self.boxes.iter().any(|b| &b.id == id));
        if self.selected != id {
            log::debug!("Selected {:?}", id);
        }
        self.selected = id;
        self.reattach_interaction();
    }

    pub fn cycle(&mut self, direction: CycleDirection) {
        let next = cycle_selection(&self.boxes, self.selected.as_deref(), self.last_pointer, direction);
        if next.is_some() {
            self.select(next);
        }
    }

    /// Point the idle interaction at the selected box.
    fn reattach_interaction(&mut self) {
        if self.interaction.as_ref().is_some_and(|i| !i.is_idle()) {
            return;
        }
        let selected = self
            .selected
            .as_deref()
            .and_then(|id| self.boxes.iter().find(|b| b.id == id));
        self.interaction = match (selected, self.interaction.take()) {
            (Some(b), Some(mut interaction)) if interaction.id() == b.id => {
                interaction.sync(b);
                Some(interaction)
            }
            (Some(b), _) => Some(BoxInteraction::new(b)),
            (None, _) => None,
        };
    }

    // ----------------------------------------------------------------------
    // Mutations
    // ----------------------------------------------------------------------

    fn record(&mut self) {
        self.history.push(self.boxes.clone());
        self.revision += 1;
    }

    fn commit_geometry(&mut self, id: &str, rect: BoxRect) {
        let (iw, ih) = self.image_size();
        let rect = clamp_size(rect, iw, ih);
        let Some(index) = self.boxes.iter().position(|b| b.id == id) else {
            return;
        };
        if self.boxes[index].rect() == rect {
            return;
        }
        self.record();
        self.boxes[index].set_rect(rect);
        log::debug!(
            "Committed {} at ({:.1}, {:.1}) {:.1}x{:.1}",
            id,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
        if let Some(interaction) = self.interaction.as_mut() {
            if interaction.id() == id {
                interaction.sync(&self.boxes[index]);
            }
        }
    }

    fn finish_draw(&mut self, rect: BoxRect) {
        if rect.width <= MIN_SIZE || rect.height <= MIN_SIZE {
            log::debug!("Discarded {:.1}x{:.1} draw below minimum size", rect.width, rect.height);
            return;
        }
        match self.labels.len() {
            0 => log::warn!("No labels defined, discarding drawn box"),
            1 => {
                let label = self.labels[0].clone();
                self.create_box(rect, &label);
            }
            _ => self.picker.open(rect),
        }
    }

    fn create_box(&mut self, rect: BoxRect, label: &Label) {
        let (iw, ih) = self.image_size();
        let rect = clamp_size(rect, iw, ih);
        let id = format!("{}{}", DRAFT_ID_PREFIX, self.next_draft);
        self.next_draft += 1;
        self.record();
        self.boxes.push(AnnotationBox::new(id.clone(), rect, label));
        log::info!("Added '{}' box, total: {}", label.name, self.boxes.len());
        self.select(Some(id));
    }

    fn apply_picker_outcome(&mut self, outcome: Option<PickerOutcome>) {
        match outcome {
            Some(PickerOutcome::Selected { label, pending }) => self.create_box(pending, &label),
            Some(PickerOutcome::Cancelled) => log::debug!("Label pick cancelled, box discarded"),
            None => {}
        }
    }

    /// Choose a label by id for the pending box.
    pub fn picker_pick(&mut self, label_id: &str) {
        let outcome = self.picker.pick(label_id);
        self.apply_picker_outcome(outcome);
    }

    /// Close the picker without a label; the drawn box is discarded.
    pub fn picker_cancel(&mut self) {
        let outcome = self.picker.cancel();
        self.apply_picker_outcome(outcome);
    }

    /// Number key 1–9.
    ///
    /// Picks from the filtered picker list while it is open, otherwise
    /// reassigns the selected box to the label at that position.
    pub fn quick_label(&mut self, ordinal: usize) {
        if self.picker.is_open() {
            let outcome = self.picker.pick_ordinal(ordinal);
            self.apply_picker_outcome(outcome);
            return;
        }
        let Some(label) = ordinal.checked_sub(1).and_then(|i| self.labels.get(i)).cloned() else {
            return;
        };
        if let Some(id) = self.selected.clone() {
            self.assign_label(&id, &label);
        }
    }

    /// Reassign a box to another label.
    pub fn assign_label(&mut self, id: &str, label: &Label) {
        let Some(index) = self.boxes.iter().position(|b| b.id == id) else {
            return;
        };
        if self.boxes[index].label_id == label.id {
            return;
        }
        self.record();
        self.boxes[index].set_label(label);
        log::info!("Box {} relabeled as '{}'", id, label.name);
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected.clone() else {
            return;
        };
        let Some(index) = self.boxes.iter().position(|b| b.id == id) else {
            return;
        };
        self.abort_pointer();
        self.record();
        self.boxes.remove(index);
        self.select(None);
        log::info!("Deleted box {}, total: {}", id, self.boxes.len());
    }

    pub fn undo(&mut self) {
        self.abort_pointer();
        if let Some(previous) = self.history.undo(self.boxes.clone()) {
            self.replace_from_history(previous);
            log::info!("Undo");
        }
    }

    pub fn redo(&mut self) {
        self.abort_pointer();
        if let Some(next) = self.history.redo(self.boxes.clone()) {
            self.replace_from_history(next);
            log::info!("Redo");
        }
    }

    fn replace_from_history(&mut self, boxes: Vec<AnnotationBox>) {
        self.boxes = boxes;
        self.revision += 1;
        let keep = self.selected.clone();
        self.select(keep);
    }

    // ----------------------------------------------------------------------
    // Keyboard
    // ----------------------------------------------------------------------

    /// Run a keyboard command.
    ///
    /// While the picker is open only number keys and Escape reach it.
    pub fn execute(&mut self, command: Command) -> Option<HostRequest> {
        if self.picker.is_open() {
            match command {
                Command::QuickLabel(n) => self.quick_label(n),
                Command::Escape => self.picker_cancel(),
                _ => {}
            }
            return None;
        }

        match command {
            Command::PreviousFrame => return Some(HostRequest::PreviousFrame),
            Command::NextFrame => return Some(HostRequest::NextFrame),
            Command::Save => return Some(HostRequest::Save),
            Command::ToggleMode => self.toggle_mode(),
            Command::SelectMode => self.set_mode(InteractionMode::Select),
            Command::DrawMode => self.set_mode(InteractionMode::Draw),
            Command::Escape => self.escape(),
            Command::QuickLabel(n) => self.quick_label(n),
            Command::CycleForward => self.cycle(CycleDirection::Forward),
            Command::CycleBackward => self.cycle(CycleDirection::Backward),
            Command::DeleteSelected => self.delete_selected(),
            Command::ToggleLabels => self.toggle_label_visibility(),
            Command::BeginPan => self.begin_pan_override(),
            Command::EndPan => self.end_pan_override(),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
        }
        None
    }

    // ----------------------------------------------------------------------
    // Persistence boundary
    // ----------------------------------------------------------------------

    /// Snapshot the canonical list as a normalized save body.
    pub fn save_snapshot(&self) -> SaveSnapshot {
        SaveSnapshot {
            revision: self.revision,
            request: BulkSaveRequest::from_boxes(&self.boxes, self.image_size.0, self.image_size.1),
        }
    }

    /// Adopt the stored records after a successful save.
    ///
    /// Skipped when the list changed after the snapshot was taken, so an
    /// acknowledgment never overwrites newer edits. During a box gesture only
    /// the assigned ids are taken over, once the gesture ends. Returns whether
    /// the records were adopted or queued.
    pub fn apply_saved(&mut self, revision: u64, records: &[SavedAnnotation]) -> bool {
        if revision != self.revision {
            log::debug!("Save acknowledgment for revision {} is stale", revision);
            return false;
        }
        let ids: Vec<String> = self.boxes.iter().map(|b| b.id.clone()).collect();
        if self.pointer == PointerState::BoxGesture {
            log::debug!("Save acknowledgment deferred until the gesture ends");
            self.deferred_ack = Some(DeferredAck {
                ids,
                records: records.to_vec(),
            });
            return true;
        }

        let (width, height) = self.image_size;
        let selected = self.selected.as_deref().and_then(|id| saved_id_for(&ids, records, id));
        self.boxes = boxes_from_saved(records, &self.labels, width, height);
        self.interaction = None;
        self.select(selected);
        true
    }

    /// Rename boxes to the ids a deferred save assigned.
    fn adopt_deferred_ack(&mut self) {
        let Some(DeferredAck { ids, records }) = self.deferred_ack.take() else {
            return;
        };
        for (old, record) in ids.iter().zip(&records) {
            if let Some(b) = self.boxes.iter_mut().find(|b| &b.id == old) {
                b.id = record.id.clone();
            }
        }
        let selected = self.selected.as_deref().and_then(|id| saved_id_for(&ids, &records, id));
        self.interaction = None;
        self.select(selected);
    }
}

/// Id the store gave to the box saved as `id`.
fn saved_id_for(ids: &[String], records: &[SavedAnnotation], id: &str) -> Option<String> {
    let index = ids.iter().position(|i| i == id)?;
    records.get(index).map(|r| r.id.clone())
}
