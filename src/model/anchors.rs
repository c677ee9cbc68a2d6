// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Anchor points placed by the interaction layer

use crate::error::{ResectionError, Result};
use crate::geometry::{derive_plane, Plane};
use crate::utils::math::is_finite_point;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Anchors defining the cutting plane. Only a pair defines a plane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoints {
    points: Vec<Point3<f64>>,
}

impl AnchorPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair(p1: Point3<f64>, p2: Point3<f64>) -> Self {
        Self { points: vec![p1, p2] }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn push(&mut self, point: Point3<f64>) -> Result<()> {
        if !is_finite_point(&point) {
            return Err(ResectionError::NonFiniteCoordinate(self.points.len()));
        }
        self.points.push(point);
        Ok(())
    }

    /// Move an anchor
    pub fn set(&mut self, index: usize, point: Point3<f64>) -> Result<()> {
        if !is_finite_point(&point) {
            return Err(ResectionError::NonFiniteCoordinate(index));
        }
        let len = self.points.len();
        let slot = self
            .points
            .get_mut(index)
            .ok_or(ResectionError::IndexOutOfRange { index, len })?;
        *slot = point;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Point3<f64>> {
        if index >= self.points.len() {
            return Err(ResectionError::IndexOutOfRange {
                index,
                len: self.points.len(),
            });
        }
        Ok(self.points.remove(index))
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Cutting plane, defined only for exactly two anchors
    pub fn plane(&self) -> Option<Plane> {
        match self.points[..] {
            [p1, p2] => Some(derive_plane(&p1, &p2)),
            _ => None,
        }
    }
}
