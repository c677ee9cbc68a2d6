// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Cutting plane derived from a pair of anchor points

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Length below which a plane normal is treated as zero
pub const DEGENERATE_NORMAL_EPS: f64 = 1e-9;

/// Plane given by an origin and a (not necessarily unit) normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    pub fn new(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { origin, normal }
    }

    /// A plane whose normal is too short to define an orientation.
    /// Callers skip the cut for such planes.
    pub fn is_degenerate(&self) -> bool {
        self.is_degenerate_within(DEGENERATE_NORMAL_EPS)
    }

    pub fn is_degenerate_within(&self, epsilon: f64) -> bool {
        !(self.normal.norm() > epsilon)
    }

    /// Normalized normal, `None` for a degenerate plane
    pub fn unit_normal(&self) -> Option<Vector3<f64>> {
        if self.is_degenerate() {
            None
        } else {
            Some(self.normal.normalize())
        }
    }

    /// Signed distance along the unit normal (0 for a degenerate plane)
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        match self.unit_normal() {
            Some(n) => n.dot(&(point - self.origin)),
            None => 0.0,
        }
    }

    /// Right-handed orthonormal in-plane basis `(u, v)` with `u x v = n`
    pub fn basis(&self) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let n = self.unit_normal()?;
        let helper = if n.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let u = helper.cross(&n).normalize();
        let v = n.cross(&u);
        Some((u, v))
    }
}

/// Derive the cutting plane from two anchor points.
///
/// The origin is the midpoint and the normal is `p2 - p1`, left
/// unnormalized. Coincident anchors give a zero normal, i.e. a degenerate
/// plane.
pub fn derive_plane(p1: &Point3<f64>, p2: &Point3<f64>) -> Plane {
    Plane {
        origin: nalgebra::center(p1, p2),
        normal: p2 - p1,
    }
}
