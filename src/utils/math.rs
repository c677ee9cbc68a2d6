// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Math utilities

use nalgebra::Point3;
use std::cmp::Ordering;

/// Whether every coordinate is finite
pub fn is_finite_point(p: &Point3<f64>) -> bool {
    p.iter().all(|c| c.is_finite())
}

/// Total order on points, x first, then y, then z
pub fn lexicographic_cmp(a: &Point3<f64>, b: &Point3<f64>) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}
