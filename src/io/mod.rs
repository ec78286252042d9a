// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for frames, project files, annotation storage and export.

pub mod export;
pub mod media;
pub mod serialization;
pub mod store;
