// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Geometry module - mesh representation and the resection geometry operations

mod bbox;
mod bezier;
mod cutter;
mod mesh;
pub mod mesh_utils;
mod plane;
mod primitives;
pub mod triangulate;

pub use bbox::BoundingBox;
pub use bezier::{bernstein3, bernstein3_derivative, tessellate, BezierPatch, PATCH_ORDER, PATCH_POINTS};
pub use cutter::{cut, cut_with, fill_normal, Contour, ContourLoop, CutOptions};
pub use mesh::{Mesh, Triangle, Vertex};
pub use plane::{derive_plane, Plane, DEGENERATE_NORMAL_EPS};
pub use primitives::Primitive;
