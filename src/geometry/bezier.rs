// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Bicubic tensor-product Bezier patch
//!
//! Control points are row-major: point `(row, col)` sits at
//! `row * 4 + col`. The `u` parameter runs along a row (columns) and `v`
//! runs across rows, so `P(0, 0)` is the first control point and
//! `P(1, 1)` the last. Surface normals are `dP/du x dP/dv`.

use super::{Mesh, Triangle, Vertex};
use crate::error::TessellationError;
use nalgebra::{Point3, Vector3};

/// Control points per parametric direction
pub const PATCH_ORDER: usize = 4;

/// Control points of one patch
pub const PATCH_POINTS: usize = PATCH_ORDER * PATCH_ORDER;

/// Cubic Bernstein basis at `t`
#[inline]
pub fn bernstein3(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

/// Derivative of the cubic Bernstein basis at `t`
#[inline]
pub fn bernstein3_derivative(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [
        -3.0 * s * s,
        3.0 * s * s - 6.0 * t * s,
        6.0 * t * s - 3.0 * t * t,
        3.0 * t * t,
    ]
}

/// Bicubic Bezier patch
#[derive(Debug, Clone, PartialEq)]
pub struct BezierPatch {
    points: [Point3<f64>; PATCH_POINTS],
}

impl BezierPatch {
    pub fn new(points: [Point3<f64>; PATCH_POINTS]) -> Self {
        Self { points }
    }

    /// Patch from the first 16 points of a row-major control net.
    ///
    /// Fewer points means the surface is not ready yet.
    pub fn from_slice(points: &[Point3<f64>]) -> Result<Self, TessellationError> {
        if points.len() < PATCH_POINTS {
            return Err(TessellationError::SurfaceNotReady {
                required: PATCH_POINTS,
                available: points.len(),
            });
        }
        let mut grid = [Point3::origin(); PATCH_POINTS];
        grid.copy_from_slice(&points[..PATCH_POINTS]);
        Ok(Self::new(grid))
    }

    pub fn control_point(&self, row: usize, col: usize) -> &Point3<f64> {
        &self.points[row * PATCH_ORDER + col]
    }

    fn combine(&self, bu: &[f64; 4], bv: &[f64; 4]) -> Vector3<f64> {
        let mut sum = Vector3::zeros();
        for (row, wv) in bv.iter().enumerate() {
            for (col, wu) in bu.iter().enumerate() {
                sum += self.points[row * PATCH_ORDER + col].coords * (wu * wv);
            }
        }
        sum
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3<f64> {
        Point3::from(self.combine(&bernstein3(u), &bernstein3(v)))
    }

    pub fn derivative_u(&self, u: f64, v: f64) -> Vector3<f64> {
        self.combine(&bernstein3_derivative(u), &bernstein3(v))
    }

    pub fn derivative_v(&self, u: f64, v: f64) -> Vector3<f64> {
        self.combine(&bernstein3(u), &bernstein3_derivative(v))
    }

    /// Unit normal, `None` where the tangents are parallel or vanish
    pub fn normal(&self, u: f64, v: f64) -> Option<Vector3<f64>> {
        self.derivative_u(u, v)
            .cross(&self.derivative_v(u, v))
            .try_normalize(f64::EPSILON)
    }

    /// Sample the patch on a `(res_u + 1) x (res_v + 1)` grid and
    /// triangulate it, two triangles per cell.
    ///
    /// Vertex `(i, j)` is stored at `j * (res_u + 1) + i`. Triangles are
    /// wound so their facet normals agree with [`BezierPatch::normal`].
    pub fn tessellate(&self, res_u: u32, res_v: u32) -> Result<Mesh, TessellationError> {
        if res_u == 0 || res_v == 0 {
            return Err(TessellationError::InvalidResolution(res_u, res_v));
        }
        let (nu, nv) = (res_u as usize, res_v as usize);
        let stride = nu + 1;

        let basis_u: Vec<([f64; 4], [f64; 4])> = (0..=nu)
            .map(|i| {
                let u = i as f64 / nu as f64;
                (bernstein3(u), bernstein3_derivative(u))
            })
            .collect();

        let mut mesh = Mesh::with_capacity(stride * (nv + 1), 2 * nu * nv);
        let mut missing_normals = Vec::new();

        for j in 0..=nv {
            let v = j as f64 / nv as f64;
            let (bv, dbv) = (bernstein3(v), bernstein3_derivative(v));
            for (bu, dbu) in &basis_u {
                let position = Point3::from(self.combine(bu, &bv));
                let du = self.combine(dbu, &bv);
                let dv = self.combine(bu, &dbv);
                let normal = match du.cross(&dv).try_normalize(f64::EPSILON) {
                    Some(n) => n,
                    None => {
                        missing_normals.push(mesh.vertices.len());
                        Vector3::z()
                    }
                };
                mesh.add_vertex(Vertex::new(position, normal));
            }
        }

        for j in 0..nv {
            for i in 0..nu {
                let i00 = j * stride + i;
                let i10 = i00 + 1;
                let i01 = i00 + stride;
                let i11 = i01 + 1;
                mesh.add_triangle(Triangle::new([i00, i10, i11]));
                mesh.add_triangle(Triangle::new([i00, i11, i01]));
            }
        }

        // Collapsed patch edges have no analytic normal; use the facet average
        if !missing_normals.is_empty() {
            let mut averaged = mesh.clone();
            averaged.recompute_normals();
            for k in missing_normals {
                mesh.vertices[k].normal = averaged.vertices[k].normal;
            }
        }

        Ok(mesh)
    }
}

/// Tessellate the patch defined by a row-major control net.
///
/// Returns [`TessellationError::SurfaceNotReady`] when fewer than 16
/// points are available.
pub fn tessellate(points: &[Point3<f64>], res_u: u32, res_v: u32) -> Result<Mesh, TessellationError> {
    BezierPatch::from_slice(points)?.tessellate(res_u, res_v)
}
