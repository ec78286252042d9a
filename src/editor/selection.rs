// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Hit testing and selection cycling through overlapping boxes.
//!
//! Boxes are drawn in list order, so the last box in the list is topmost.
//! Cycling walks candidates in that same stable order.

use crate::models::annotation::{AnnotationBox, Point};

/// Direction of a selection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Forward,
    Backward,
}

/// Topmost box containing `point`.
pub fn hit_test(boxes: &[AnnotationBox], point: Point) -> Option<&AnnotationBox> {
    boxes.iter().rev().find(|b| b.rect().contains(point))
}

/// Pick the next box id to select.
///
/// Candidates are the boxes under `point`; when there is no point, or no
/// box contains it, every box is a candidate.
pub fn cycle_selection(
    boxes: &[AnnotationBox],
    selected: Option<&str>,
    point: Option<Point>,
    direction: CycleDirection,
) -> Option<String> {
    let under_point: Vec<&AnnotationBox> = match point {
        Some(p) => boxes.iter().filter(|b| b.rect().contains(p)).collect(),
        None => Vec::new(),
    };
    let candidates: Vec<&AnnotationBox> = if under_point.is_empty() {
        boxes.iter().collect()
    } else {
        under_point
    };
    if candidates.is_empty() {
        return None;
    }

    let count = candidates.len();
    let current = selected.and_then(|id| candidates.iter().position(|b| b.id == id));
    let index = match (current, direction) {
        (Some(i), CycleDirection::Forward) => (i + 1) % count,
        (Some(i), CycleDirection::Backward) => (i + count - 1) % count,
        (None, CycleDirection::Forward) => 0,
        (None, CycleDirection::Backward) => count - 1,
    };
    Some(candidates[index].id.clone())
}
