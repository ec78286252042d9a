// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Headless annotation canvas: box interaction, selection, history,
//! keyboard commands and the controller tying them together.

pub mod bounding_box;
pub mod commands;
pub mod controller;
pub mod history;
pub mod label_picker;
pub mod selection;
pub mod viewport;
