// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Resection data model

mod anchors;
mod control_net;
mod markups;
mod scene;

pub use anchors::AnchorPoints;
pub use control_net::{default_grid, ControlNet, ControlPoint, DEFAULT_GRID_HALF_EXTENT};
pub use markups::{MarkupEditor, PickIndex};
pub use scene::{MeshHandle, MeshLookup, MeshScene};
