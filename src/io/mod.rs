// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! I/O module - mesh and point list import/export for tooling

mod points;
mod stl;

pub use points::{parse_point, parse_points, read_points, write_points};
pub use stl::{export_stl, import_stl, import_stl_with, DEFAULT_WELD_TOLERANCE};
