// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interaction state of a single bounding box.
//!
//! A `BoxInteraction` is attached to the box being selected or dragged. It
//! mirrors the box geometry in a live rectangle that follows the pointer
//! during a gesture, and only reports geometry upward when the gesture ends.
//! The canonical record is never touched from here.

use crate::models::annotation::{AnnotationBox, BoxRect, Point};
use crate::util::geometry::{
    clamp_position, clamp_size, is_within_image, meets_min_size, ScaledMetrics,
};

/// Resize handle positions around a selected box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    /// Center of this handle on `rect`.
    pub fn position(self, rect: &BoxRect) -> Point {
        let cx = rect.x + rect.width / 2.0;
        let cy = rect.y + rect.height / 2.0;
        match self {
            Handle::TopLeft => Point::new(rect.x, rect.y),
            Handle::Top => Point::new(cx, rect.y),
            Handle::TopRight => Point::new(rect.right(), rect.y),
            Handle::Right => Point::new(rect.right(), cy),
            Handle::BottomRight => Point::new(rect.right(), rect.bottom()),
            Handle::Bottom => Point::new(cx, rect.bottom()),
            Handle::BottomLeft => Point::new(rect.x, rect.bottom()),
            Handle::Left => Point::new(rect.x, cy),
        }
    }

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            Handle::TopLeft | Handle::TopRight | Handle::BottomRight | Handle::BottomLeft
        )
    }

    fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Left | Handle::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Handle::TopRight | Handle::Right | Handle::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Top | Handle::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::Bottom | Handle::BottomRight)
    }
}

/// Gesture currently driving the live geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    Dragging {
        /// Pointer offset from the box origin at pointer-down
        grab: Point,
        origin: Point,
        moved: bool,
    },
    Transforming {
        handle: Handle,
        start: BoxRect,
    },
}

/// Notifications sent from the box to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxEvent {
    Select(String),
    DragStart(String),
    DragEnd { id: String, rect: BoxRect },
    TransformStart(String),
    TransformEnd { id: String, rect: BoxRect },
}

/// Live interaction state for one box.
#[derive(Debug, Clone)]
pub struct BoxInteraction {
    id: String,
    /// Geometry shown on screen while a gesture is in progress
    live: BoxRect,
    /// Canonical geometry the live box was last synchronised from
    synced: BoxRect,
    gesture: Gesture,
}

impl BoxInteraction {
    pub fn new(annotation: &AnnotationBox) -> Self {
        Self {
            id: annotation.id.clone(),
            live: annotation.rect(),
            synced: annotation.rect(),
            gesture: Gesture::Idle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn live(&self) -> BoxRect {
        self.live
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    pub fn is_transforming(&self) -> bool {
        matches!(self.gesture, Gesture::Transforming { .. })
    }

    /// Reset the live box when the canonical record changed underneath us.
    ///
    /// Ignored while a gesture is running. Returns true if the live box moved.
    pub fn sync(&mut self, canonical: &AnnotationBox) -> bool {
        let rect = canonical.rect();
        if !self.is_idle() || rect == self.synced {
            return false;
        }
        self.synced = rect;
        self.live = rect;
        true
    }

    /// Handle under `point`, using the scale-aware hit size.
    pub fn handle_at(&self, point: Point, metrics: &ScaledMetrics) -> Option<Handle> {
        let reach = metrics.handle_size;
        Handle::ALL.into_iter().find(|handle| {
            let center = handle.position(&self.live);
            (point.x - center.x).abs() <= reach && (point.y - center.y).abs() <= reach
        })
    }

    pub fn begin_drag(&mut self, pointer: Point) {
        self.gesture = Gesture::Dragging {
            grab: Point::new(pointer.x - self.live.x, pointer.y - self.live.y),
            origin: pointer,
            moved: false,
        };
    }

    /// Move the live box with the pointer, clamped to the image.
    ///
    /// Returns `DragStart` on the first movement of the gesture.
    pub fn drag_to(&mut self, pointer: Point, image_size: (f64, f64)) -> Option<BoxEvent> {
        let Gesture::Dragging { grab, origin, moved } = self.gesture else {
            return None;
        };
        if !moved && pointer == origin {
            return None;
        }
        self.move_live_to(pointer.x - grab.x, pointer.y - grab.y, image_size);
        self.gesture = Gesture::Dragging {
            grab,
            origin,
            moved: true,
        };
        (!moved).then(|| BoxEvent::DragStart(self.id.clone()))
    }

    /// Place the live box at a proposed position, clamping it into the image.
    pub fn move_live_to(&mut self, x: f64, y: f64, (image_width, image_height): (f64, f64)) {
        let (x, y) = clamp_position(x, y, self.live.width, self.live.height, image_width, image_height);
        self.live.x = x;
        self.live.y = y;
    }

    /// Finish a drag. A gesture without movement is a click and selects.
    pub fn end_drag(&mut self, (image_width, image_height): (f64, f64)) -> Option<BoxEvent> {
        let Gesture::Dragging { moved, .. } = self.gesture else {
            return None;
        };
        self.gesture = Gesture::Idle;
        if !moved {
            return Some(BoxEvent::Select(self.id.clone()));
        }
        let (x, y) = clamp_position(
            self.live.x,
            self.live.y,
            self.live.width,
            self.live.height,
            image_width,
            image_height,
        );
        self.live.x = x;
        self.live.y = y;
        self.commit_event(|id, rect| BoxEvent::DragEnd { id, rect })
    }

    pub fn begin_transform(&mut self, handle: Handle) -> BoxEvent {
        self.gesture = Gesture::Transforming {
            handle,
            start: self.live,
        };
        BoxEvent::TransformStart(self.id.clone())
    }

    /// Apply one transform step.
    ///
    /// A step that would shrink the box under `MIN_SIZE` or leave the image
    /// is rejected as a whole; the previous live geometry is kept. Returns
    /// whether the step was applied.
    pub fn transform_to(
        &mut self,
        pointer: Point,
        aspect_locked: bool,
        (image_width, image_height): (f64, f64),
    ) -> bool {
        let Gesture::Transforming { handle, start } = self.gesture else {
            return false;
        };
        let candidate = resize_rect(start, handle, pointer, aspect_locked);
        if !meets_min_size(&candidate) || !is_within_image(&candidate, image_width, image_height) {
            return false;
        }
        self.live = candidate;
        true
    }

    /// Finish a transform: floor, cap and re-clamp, then report.
    pub fn end_transform(&mut self, (image_width, image_height): (f64, f64)) -> Option<BoxEvent> {
        if !self.is_transforming() {
            return None;
        }
        self.gesture = Gesture::Idle;
        self.live = clamp_size(self.live, image_width, image_height);
        self.commit_event(|id, rect| BoxEvent::TransformEnd { id, rect })
    }

    /// Abandon the gesture and snap back to the canonical geometry.
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
        self.live = self.synced;
    }

    /// Width × height text shown while a transform is in progress.
    pub fn dimension_readout(&self) -> Option<String> {
        self.is_transforming().then(|| {
            format!(
                "{} × {}",
                self.live.width.round() as i64,
                self.live.height.round() as i64
            )
        })
    }

    fn commit_event(&mut self, make: impl FnOnce(String, BoxRect) -> BoxEvent) -> Option<BoxEvent> {
        if self.live == self.synced {
            return None;
        }
        Some(make(self.id.clone(), self.live))
    }
}

/// Rectangle produced by dragging `handle` of `start` to `pointer`.
///
/// Edges not owned by the handle stay fixed. With `aspect_locked` the
/// start ratio is kept: corners follow the dominant axis around the
/// opposite corner, side handles derive the other dimension.
pub fn resize_rect(start: BoxRect, handle: Handle, pointer: Point, aspect_locked: bool) -> BoxRect {
    let (mut left, mut top, mut right, mut bottom) = (start.x, start.y, start.right(), start.bottom());
    if handle.moves_left() {
        left = pointer.x;
    }
    if handle.moves_right() {
        right = pointer.x;
    }
    if handle.moves_top() {
        top = pointer.y;
    }
    if handle.moves_bottom() {
        bottom = pointer.y;
    }

    if aspect_locked && start.width > 0.0 && start.height > 0.0 {
        let ratio = start.width / start.height;
        let mut width = right - left;
        let mut height = bottom - top;
        if handle.is_corner() {
            if (width / start.width).abs() >= (height / start.height).abs() {
                height = width / ratio;
            } else {
                width = height * ratio;
            }
        } else if handle.moves_left() || handle.moves_right() {
            height = width / ratio;
        } else {
            width = height * ratio;
        }
        if handle.moves_left() {
            left = right - width;
        } else {
            right = left + width;
        }
        if handle.moves_top() {
            top = bottom - height;
        } else {
            bottom = top + height;
        }
    }

    BoxRect::new(left, top, right - left, bottom - top)
}

/// Whether a box shows its floating label.
///
/// The selected box always shows it; the others follow the visibility toggle.
pub fn label_visible(is_selected: bool, show_all_labels: bool) -> bool {
    show_all_labels || is_selected
}

/// Top-left corner of the floating label for a box.
///
/// The label sits above the box, or just inside its top edge when there is
/// no room above it.
pub fn label_origin(rect: &BoxRect, metrics: &ScaledMetrics) -> Point {
    let above = rect.y - metrics.label_height;
    if above < 0.0 {
        Point::new(rect.x, rect.y)
    } else {
        Point::new(rect.x, above)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Style;
    use crate::models::annotation::Label;
    use crate::util::geometry::MIN_SIZE;

    const IMAGE: (f64, f64) = (1920.0, 1080.0);

    fn annotation(rect: BoxRect) -> AnnotationBox {
        let label = Label {
            id: "1".into(),
            name: "person".into(),
            color: "#ff0000".into(),
            description: None,
        };
        AnnotationBox::new("box-1".into(), rect, &label)
    }

    #[test]
    fn test_drag_clamps_at_origin() {
        let mut interaction = BoxInteraction::new(&annotation(BoxRect::new(0.0, 0.0, 50.0, 50.0)));
        interaction.begin_drag(Point::new(25.0, 25.0));
        assert_eq!(
            interaction.drag_to(Point::new(-5.0, 15.0), IMAGE),
            Some(BoxEvent::DragStart("box-1".into()))
        );
        assert_eq!(interaction.live(), BoxRect::new(0.0, 0.0, 50.0, 50.0));
        // Clamped back onto the original spot: nothing to commit
        assert_eq!(interaction.end_drag(IMAGE), None);
        assert!(interaction.is_idle());
    }

    #[test]
    fn test_drag_commits_clamped_position() {
        let mut interaction = BoxInteraction::new(&annotation(BoxRect::new(100.0, 100.0, 50.0, 50.0)));
        interaction.begin_drag(Point::new(110.0, 110.0));
        interaction.drag_to(Point::new(1950.0, 500.0), IMAGE);
        interaction.drag_to(Point::new(2000.0, 510.0), IMAGE);
        assert_eq!(
            interaction.end_drag(IMAGE),
            Some(BoxEvent::DragEnd {
                id: "box-1".into(),
                rect: BoxRect::new(1870.0, 500.0, 50.0, 50.0),
            })
        );
    }

    #[test]
    fn test_click_without_movement_selects() {
        let mut interaction = BoxInteraction::new(&annotation(BoxRect::new(10.0, 10.0, 50.0, 50.0)));
        interaction.begin_drag(Point::new(20.0, 20.0));
        assert_eq!(interaction.drag_to(Point::new(20.0, 20.0), IMAGE), None);
        assert_eq!(interaction.end_drag(IMAGE), Some(BoxEvent::Select("box-1".into())));
    }

    #[test]
    fn test_aspect_locked_corner_keeps_ratio() {
        let mut interaction = BoxInteraction::new(&annotation(BoxRect::new(100.0, 100.0, 200.0, 100.0)));
        interaction.begin_transform(Handle::BottomRight);
        // Free resize would give 300 × 100 (3:1)
        assert!(interaction.transform_to(Point::new(400.0, 200.0), true, IMAGE));
        let Some(BoxEvent::TransformEnd { rect, .. }) = interaction.end_transform(IMAGE) else {
            panic!("expected a transform commit");
        };
        assert_eq!(rect, BoxRect::new(100.0, 100.0, 300.0, 150.0));
        assert_eq!(rect.width / rect.height, 2.0);
    }

    #[test]
    fn test_aspect_locked_edges_and_top_left_anchor() {
        let start = BoxRect::new(100.0, 100.0, 200.0, 100.0);
        let right = resize_rect(start, Handle::Right, Point::new(500.0, 0.0), true);
        assert_eq!(right, BoxRect::new(100.0, 100.0, 400.0, 200.0));
        let top_left = resize_rect(start, Handle::TopLeft, Point::new(200.0, 0.0), true);
        // Height grew 2x, width follows around the fixed bottom-right corner
        assert_eq!(top_left, BoxRect::new(-100.0, 0.0, 400.0, 200.0));
    }

    #[test]
    fn test_free_resize_moves_only_owned_edges() {
        let start = BoxRect::new(100.0, 100.0, 200.0, 100.0);
        let rect = resize_rect(start, Handle::Top, Point::new(999.0, 40.0), false);
        assert_eq!(rect, BoxRect::new(100.0, 40.0, 200.0, 160.0));
    }

    #[test]
    fn test_transform_rejects_undersized_step() {
        let mut interaction = BoxInteraction::new(&annotation(BoxRect::new(100.0, 100.0, 200.0, 100.0)));
        interaction.begin_transform(Handle::Right);
        assert!(interaction.transform_to(Point::new(250.0, 150.0), false, IMAGE));
        assert!(!interaction.transform_to(Point::new(105.0, 150.0), false, IMAGE));
        assert_eq!(interaction.live(), BoxRect::new(100.0, 100.0, 150.0, 100.0));
    }

    #[test]
    fn test_transform_rejects_out_of_bounds_step() {
        let mut interaction = BoxInteraction::new(&annotation(BoxRect::new(100.0, 100.0, 200.0, 100.0)));
        interaction.begin_transform(Handle::TopLeft);
        assert!(!interaction.transform_to(Point::new(-20.0, 50.0), false, IMAGE));
        assert_eq!(interaction.live(), BoxRect::new(100.0, 100.0, 200.0, 100.0));
        assert_eq!(interaction.end_transform(IMAGE), None);
    }

    #[test]
    fn test_readout_only_while_transforming() {
        let mut interaction = BoxInteraction::new(&annotation(BoxRect::new(0.0, 0.0, 40.4, 30.6)));
        assert_eq!(interaction.dimension_readout(), None);
        interaction.begin_transform(Handle::Bottom);
        assert_eq!(interaction.dimension_readout().as_deref(), Some("40 × 31"));
    }

    #[test]
    fn test_sync_ignored_during_gesture() {
        let mut interaction = BoxInteraction::new(&annotation(BoxRect::new(0.0, 0.0, 50.0, 50.0)));
        let moved = annotation(BoxRect::new(30.0, 30.0, 50.0, 50.0));
        interaction.begin_transform(Handle::Right);
        assert!(!interaction.sync(&moved));
        interaction.cancel();
        assert!(interaction.sync(&moved));
        assert_eq!(interaction.live(), moved.rect());
    }

    #[test]
    fn test_handle_hit_uses_scaled_size() {
        let interaction = BoxInteraction::new(&annotation(BoxRect::new(100.0, 100.0, 200.0, 100.0)));
        let zoomed_in = ScaledMetrics::for_scale(4.0, &Style::default());
        assert_eq!(
            interaction.handle_at(Point::new(301.0, 201.0), &zoomed_in),
            Some(Handle::BottomRight)
        );
        assert_eq!(interaction.handle_at(Point::new(305.0, 205.0), &zoomed_in), None);
        assert!(MIN_SIZE > zoomed_in.handle_size);
    }

    #[test]
    fn test_label_placement() {
        let metrics = ScaledMetrics::for_scale(1.0, &Style::default());
        let top = label_origin(&BoxRect::new(10.0, 5.0, 50.0, 50.0), &metrics);
        assert_eq!(top, Point::new(10.0, 5.0));
        let above = label_origin(&BoxRect::new(10.0, 100.0, 50.0, 50.0), &metrics);
        assert_eq!(above, Point::new(10.0, 100.0 - metrics.label_height));
        assert!(label_visible(true, false));
        assert!(!label_visible(false, false));
    }
}
