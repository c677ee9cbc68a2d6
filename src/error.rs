// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Error types

/// Rejected mutations of the resection model. The model state is left
/// unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResectionError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Expected {expected} control points, got {actual}")]
    PointCountMismatch { expected: usize, actual: usize },

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Non-finite coordinate at point {0}")]
    NonFiniteCoordinate(usize),
}

/// Reasons a surface cannot be tessellated
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TessellationError {
    #[error("Surface not ready: {available} of {required} control points")]
    SurfaceNotReady { required: usize, available: usize },

    #[error("Resolution must be at least 1 in both directions, got {0}x{1}")]
    InvalidResolution(u32, u32),
}

pub type Result<T> = std::result::Result<T, ResectionError>;
