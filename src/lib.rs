// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Resection surface geometry engine
//!
//! Derives a cutting plane from two anchor points, cuts the target organ
//! mesh to produce a filled cross-section, and tessellates the bicubic
//! Bezier patch defined by a 4x4 control net. [`ResectionKernel`] ties the
//! pieces together behind an event-driven update pipeline.

pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod kernel;
pub mod model;
pub mod pipeline;
pub mod utils;

pub use config::PipelineConfig;
pub use error::{ResectionError, TessellationError};
pub use geometry::{cut, derive_plane, tessellate, Contour, Mesh, Plane, Primitive};
pub use kernel::ResectionKernel;
pub use model::{AnchorPoints, ControlNet, ControlPoint, MeshHandle, MeshLookup, MeshScene};
pub use pipeline::{ChangeSource, GeometrySink, PipelineState, Published, UpdatePipeline};
