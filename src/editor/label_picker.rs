// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Label picker state.
//!
//! The picker holds the geometry of a freshly drawn box until the user picks
//! a label for it or cancels. Filtering is a case-insensitive substring match
//! on label name and description; number keys address the filtered list.

use crate::models::annotation::{BoxRect, Label};

/// Number of filtered rows reachable with the 1–9 keys.
pub const MAX_ORDINAL: usize = 9;

/// How a picker session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerOutcome {
    Selected { label: Label, pending: BoxRect },
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct LabelPicker {
    labels: Vec<Label>,
    query: String,
    pending: Option<BoxRect>,
}

impl LabelPicker {
    pub fn new(labels: Vec<Label>) -> Self {
        Self {
            labels,
            query: String::new(),
            pending: None,
        }
    }

    pub fn set_labels(&mut self, labels: Vec<Label>) {
        self.labels = labels;
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<BoxRect> {
        self.pending
    }

    /// Open the picker for a drawn box, with an empty search.
    pub fn open(&mut self, pending: BoxRect) {
        self.pending = Some(pending);
        self.query.clear();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Mutable search text for a text field.
    pub fn query_mut(&mut self) -> &mut String {
        &mut self.query
    }

    /// Labels matching the search text, in label order.
    pub fn filtered(&self) -> Vec<&Label> {
        let needle = self.query.trim().to_lowercase();
        self.labels
            .iter()
            .filter(|label| {
                needle.is_empty()
                    || label.name.to_lowercase().contains(&needle)
                    || label
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Pick the `ordinal`-th (1-based) filtered label.
    pub fn pick_ordinal(&mut self, ordinal: usize) -> Option<PickerOutcome> {
        if !(1..=MAX_ORDINAL).contains(&ordinal) {
            return None;
        }
        let label = self.filtered().get(ordinal - 1).map(|l| (*l).clone())?;
        self.finish_with(label)
    }

    /// Pick a label by id, as from a click on its row.
    pub fn pick(&mut self, label_id: &str) -> Option<PickerOutcome> {
        let label = self.labels.iter().find(|l| l.id == label_id).cloned()?;
        self.finish_with(label)
    }

    /// Close without choosing. The pending box is dropped.
    pub fn cancel(&mut self) -> Option<PickerOutcome> {
        self.pending.take()?;
        self.query.clear();
        Some(PickerOutcome::Cancelled)
    }

    fn finish_with(&mut self, label: Label) -> Option<PickerOutcome> {
        let pending = self.pending.take()?;
        self.query.clear();
        Some(PickerOutcome::Selected { label, pending })
    }
}
