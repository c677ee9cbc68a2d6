// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Control net of the resection surface and its anatomical associations

use super::MeshHandle;
use crate::config::PipelineConfig;
use crate::error::{ResectionError, Result};
use crate::geometry::{Plane, PATCH_ORDER};
use crate::utils::math::is_finite_point;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Half width of the default control grid
pub const DEFAULT_GRID_HALF_EXTENT: f64 = 100.0;

/// One control point with its interactive state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub position: Point3<f64>,
    pub label: String,
    pub selected: bool,
    pub visible: bool,
}

impl ControlPoint {
    pub fn new(position: Point3<f64>, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
            selected: false,
            visible: true,
        }
    }
}

fn default_label(index: usize) -> String {
    format!("C-{index}")
}

/// Lowest-numbered `C-n` label not used by `points`
fn unused_label(points: &[ControlPoint], index: usize) -> String {
    (0..)
        .map(default_label)
        .find(|label| points.iter().all(|p| &p.label != label))
        .unwrap_or_else(|| default_label(index))
}

/// Flat row-major 4x4 grid on z = 0 spanning `[-half, half]^2`.
/// Rows advance along y, columns along x.
pub fn default_grid(half_extent: f64) -> Vec<Point3<f64>> {
    let step = 2.0 * half_extent / (PATCH_ORDER - 1) as f64;
    (0..PATCH_ORDER)
        .flat_map(|row| {
            (0..PATCH_ORDER).map(move |col| {
                Point3::new(
                    -half_extent + col as f64 * step,
                    -half_extent + row as f64 * step,
                    0.0,
                )
            })
        })
        .collect()
}

/// Grid of control points plus target organ, tumors and margin.
///
/// Every successful mutation bumps [`ControlNet::modified_count`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlNet {
    rows: usize,
    cols: usize,
    points: Vec<ControlPoint>,
    target_organ: Option<MeshHandle>,
    target_tumors: Vec<MeshHandle>,
    resection_margin: f64,
    modified: u64,
}

impl ControlNet {
    /// Default flat grid with the given resection margin
    pub fn new(resection_margin: f64) -> Self {
        let points = default_grid(DEFAULT_GRID_HALF_EXTENT)
            .into_iter()
            .enumerate()
            .map(|(i, p)| ControlPoint::new(p, default_label(i)))
            .collect();
        Self {
            rows: PATCH_ORDER,
            cols: PATCH_ORDER,
            points,
            target_organ: None,
            target_tumors: Vec::new(),
            resection_margin: if resection_margin.is_finite() && resection_margin >= 0.0 {
                resection_margin
            } else {
                0.0
            },
            modified: 0,
        }
    }

    pub fn with_config(config: &PipelineConfig) -> Self {
        Self::new(config.default_resection_margin)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of points a complete net holds
    pub fn expected_len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the net holds `rows x cols` points
    pub fn is_complete(&self) -> bool {
        self.points.len() == self.expected_len()
    }

    pub fn modified_count(&self) -> u64 {
        self.modified
    }

    pub(crate) fn mark_modified(&mut self) {
        self.modified += 1;
    }

    /// Replace every control point position.
    ///
    /// The slice is copied. Labels and interactive state of existing
    /// indices are kept. Rejected input leaves the net untouched.
    pub fn set_control_points(&mut self, points: &[Point3<f64>]) -> Result<()> {
        if points.is_empty() {
            return Err(ResectionError::InvalidArgument("No points provided".into()));
        }
        if points.len() != self.expected_len() {
            return Err(ResectionError::PointCountMismatch {
                expected: self.expected_len(),
                actual: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !is_finite_point(p)) {
            return Err(ResectionError::NonFiniteCoordinate(index));
        }

        self.points.truncate(points.len());
        for (i, position) in points.iter().enumerate() {
            match self.points.get_mut(i) {
                Some(point) => point.position = *position,
                None => {
                    let label = unused_label(&self.points, i);
                    self.points.push(ControlPoint::new(*position, label));
                }
            }
        }
        self.mark_modified();
        Ok(())
    }

    /// Positions in row-major order
    pub fn control_points(&self) -> Vec<Point3<f64>> {
        self.points.iter().map(|p| p.position).collect()
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&ControlPoint> {
        self.points.get(index)
    }

    pub(crate) fn point_mut(&mut self, index: usize) -> Result<&mut ControlPoint> {
        let len = self.points.len();
        self.points
            .get_mut(index)
            .ok_or(ResectionError::IndexOutOfRange { index, len })
    }

    pub(crate) fn points_mut(&mut self) -> &mut [ControlPoint] {
        &mut self.points
    }

    pub(crate) fn remove_point(&mut self, index: usize) -> Result<ControlPoint> {
        if index >= self.points.len() {
            return Err(ResectionError::IndexOutOfRange {
                index,
                len: self.points.len(),
            });
        }
        let removed = self.points.remove(index);
        self.mark_modified();
        Ok(removed)
    }

    /// Replace the grid by a flat grid lying on `plane`, centred on its
    /// origin and spanning `[-half_extent, half_extent]^2` in the plane basis
    pub fn fit_to_plane(&mut self, plane: &Plane, half_extent: f64) -> Result<()> {
        if !(half_extent.is_finite() && half_extent > 0.0) {
            return Err(ResectionError::InvalidArgument(format!(
                "Grid extent must be positive, got {half_extent}"
            )));
        }
        let (u, v) = plane
            .basis()
            .ok_or_else(|| ResectionError::InvalidArgument("Degenerate plane".into()))?;

        let points: Vec<Point3<f64>> = default_grid(half_extent)
            .iter()
            .map(|p| plane.origin + u * p.x + v * p.y)
            .collect();
        self.set_control_points(&points)
    }

    pub fn target_organ(&self) -> Option<MeshHandle> {
        self.target_organ
    }

    /// Assign or clear (`None`) the target organ. Never fails.
    pub fn set_target_organ(&mut self, organ: Option<MeshHandle>) {
        self.target_organ = organ;
        self.mark_modified();
    }

    /// Tumors in insertion order
    pub fn target_tumors(&self) -> &[MeshHandle] {
        &self.target_tumors
    }

    /// Add a tumor; returns `false` if it was already present
    pub fn add_target_tumor(&mut self, tumor: MeshHandle) -> bool {
        if self.target_tumors.contains(&tumor) {
            return false;
        }
        self.target_tumors.push(tumor);
        self.mark_modified();
        true
    }

    /// Remove a tumor; returns `false` if it was not present
    pub fn remove_target_tumor(&mut self, tumor: MeshHandle) -> bool {
        match self.target_tumors.iter().position(|t| *t == tumor) {
            Some(index) => {
                self.target_tumors.remove(index);
                self.mark_modified();
                true
            }
            None => false,
        }
    }

    pub fn number_of_target_tumors(&self) -> usize {
        self.target_tumors.len()
    }

    pub fn resection_margin(&self) -> f64 {
        self.resection_margin
    }

    pub fn set_resection_margin(&mut self, margin: f64) -> Result<()> {
        if !(margin.is_finite() && margin >= 0.0) {
            return Err(ResectionError::InvalidArgument(format!(
                "Resection margin must be finite and non-negative, got {margin}"
            )));
        }
        self.resection_margin = margin;
        self.mark_modified();
        Ok(())
    }
}

impl Default for ControlNet {
    fn default() -> Self {
        Self::with_config(&PipelineConfig::default())
    }
}
