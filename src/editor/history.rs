// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Undo/redo history over full snapshots of the box list.

use crate::models::annotation::AnnotationBox;

/// History system for undo/redo functionality.
#[derive(Debug, Clone)]
pub struct History {
    /// Undo stack (past states)
    undo_stack: Vec<Vec<AnnotationBox>>,
    /// Redo stack (future states after undo)
    redo_stack: Vec<Vec<AnnotationBox>>,
    /// Maximum history size
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    /// Save current state before making a change
    pub fn push(&mut self, boxes: Vec<AnnotationBox>) {
        self.undo_stack.push(boxes);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
        // A new branch invalidates everything that could be redone
        self.redo_stack.clear();
        log::debug!("History push, {} undo entries", self.undo_stack.len());
    }

    /// Undo: restore previous state
    pub fn undo(&mut self, current: Vec<AnnotationBox>) -> Option<Vec<AnnotationBox>> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Redo: restore next state
    pub fn redo(&mut self, current: Vec<AnnotationBox>) -> Option<Vec<AnnotationBox>> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
