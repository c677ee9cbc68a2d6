// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Closed test shapes and marker geometry
//!
//! Every generator produces a closed, consistently wound mesh with shared
//! vertices, which is what the cutter expects from an organ surface.

use super::{Mesh, Triangle, Vertex};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Geometric primitives
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Cube { size: Vector3<f64>, center: bool },
    Sphere { r: f64, segments: u32 },
    Cylinder { h: f64, r: f64, segments: u32 },
    Torus { major: f64, minor: f64, segments: u32 },
}

fn segments_or_default(segments: u32) -> u32 {
    if segments >= 3 {
        segments
    } else {
        32
    }
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(r: f64, segments: u32) -> Self {
        Self::Sphere {
            r,
            segments: segments_or_default(segments),
        }
    }

    /// Cylinder along +z, centered on the origin
    pub fn cylinder(h: f64, r: f64, segments: u32) -> Self {
        Self::Cylinder {
            h,
            r,
            segments: segments_or_default(segments),
        }
    }

    /// Torus around the z axis
    pub fn torus(major: f64, minor: f64, segments: u32) -> Self {
        Self::Torus {
            major,
            minor,
            segments: segments_or_default(segments),
        }
    }

    pub fn to_mesh(&self) -> Mesh {
        match *self {
            Self::Cube { size, center } => generate_cube_mesh(size, center),
            Self::Sphere { r, segments } => generate_sphere_mesh(r, segments),
            Self::Cylinder { h, r, segments } => generate_cylinder_mesh(h, r, segments),
            Self::Torus {
                major,
                minor,
                segments,
            } => generate_torus_mesh(major, minor, segments),
        }
    }
}

fn generate_cube_mesh(size: Vector3<f64>, center: bool) -> Mesh {
    let min = if center {
        Point3::from(-size / 2.0)
    } else {
        Point3::origin()
    };
    let max = min + size;

    let positions = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    // Two outward-wound triangles per face: z+, z-, x+, x-, y+, y-
    let faces = [
        [4, 5, 6],
        [4, 6, 7],
        [1, 0, 3],
        [1, 3, 2],
        [5, 1, 2],
        [5, 2, 6],
        [0, 4, 7],
        [0, 7, 3],
        [7, 6, 2],
        [7, 2, 3],
        [0, 1, 5],
        [0, 5, 4],
    ];

    Mesh::from_indexed(&positions, &faces)
}

fn generate_sphere_mesh(radius: f64, segments: u32) -> Mesh {
    let stacks = segments as usize;
    let slices = segments as usize;
    let mut mesh = Mesh::with_capacity(2 + (stacks - 1) * slices, 2 * stacks * slices);

    let north = mesh.add_vertex(Vertex::new(Point3::new(0.0, 0.0, radius), Vector3::z()));
    for i in 1..stacks {
        let phi = PI * i as f64 / stacks as f64;
        for j in 0..slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            let normal = Vector3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
            mesh.add_vertex(Vertex::new(Point3::from(normal * radius), normal));
        }
    }
    let south = mesh.add_vertex(Vertex::new(Point3::new(0.0, 0.0, -radius), -Vector3::z()));

    let ring = |i: usize, j: usize| 1 + (i - 1) * slices + (j % slices);

    for j in 0..slices {
        mesh.add_triangle(Triangle::new([north, ring(1, j), ring(1, j + 1)]));
    }
    for i in 1..stacks - 1 {
        for j in 0..slices {
            let (u0, u1) = (ring(i, j), ring(i, j + 1));
            let (l0, l1) = (ring(i + 1, j), ring(i + 1, j + 1));
            mesh.add_triangle(Triangle::new([u0, l0, l1]));
            mesh.add_triangle(Triangle::new([u0, l1, u1]));
        }
    }
    for j in 0..slices {
        mesh.add_triangle(Triangle::new([south, ring(stacks - 1, j + 1), ring(stacks - 1, j)]));
    }

    mesh
}

fn generate_cylinder_mesh(height: f64, radius: f64, segments: u32) -> Mesh {
    let n = segments as usize;
    let half = height / 2.0;

    let mut positions = Vec::with_capacity(2 * n + 2);
    positions.push(Point3::new(0.0, 0.0, -half));
    positions.push(Point3::new(0.0, 0.0, half));
    for i in 0..n {
        let angle = 2.0 * PI * i as f64 / n as f64;
        let (sin, cos) = angle.sin_cos();
        positions.push(Point3::new(radius * cos, radius * sin, -half));
        positions.push(Point3::new(radius * cos, radius * sin, half));
    }

    let bottom = |i: usize| 2 + 2 * (i % n);
    let top = |i: usize| 3 + 2 * (i % n);

    let mut faces = Vec::with_capacity(4 * n);
    for i in 0..n {
        faces.push([0, bottom(i + 1), bottom(i)]);
        faces.push([1, top(i), top(i + 1)]);
        faces.push([bottom(i), top(i), bottom(i + 1)]);
        faces.push([top(i), top(i + 1), bottom(i + 1)]);
    }

    Mesh::from_indexed(&positions, &faces)
}

fn generate_torus_mesh(major: f64, minor: f64, segments: u32) -> Mesh {
    let around = segments as usize;
    let tube = (segments as usize / 2).max(3);

    let mut positions = Vec::with_capacity(around * tube);
    for i in 0..around {
        let a = 2.0 * PI * i as f64 / around as f64;
        for j in 0..tube {
            let b = 2.0 * PI * j as f64 / tube as f64;
            let ring = major + minor * b.cos();
            positions.push(Point3::new(ring * a.cos(), ring * a.sin(), minor * b.sin()));
        }
    }

    let index = |i: usize, j: usize| (i % around) * tube + (j % tube);
    let mut faces = Vec::with_capacity(2 * around * tube);
    for i in 0..around {
        for j in 0..tube {
            faces.push([index(i, j), index(i + 1, j), index(i + 1, j + 1)]);
            faces.push([index(i, j), index(i + 1, j + 1), index(i, j + 1)]);
        }
    }

    Mesh::from_indexed(&positions, &faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh_utils::{is_closed, is_manifold, signed_volume};
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_is_closed_and_outward() {
        let mesh = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true).to_mesh();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(is_manifold(&mesh));
        assert!(is_closed(&mesh));
        assert_relative_eq!(signed_volume(&mesh), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_uncentered_cube_starts_at_origin() {
        let mesh = Primitive::cube(Vector3::new(1.0, 2.0, 3.0), false).to_mesh();
        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Point3::origin());
        assert_eq!(bbox.max, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_sphere_is_closed_and_outward() {
        let mesh = Primitive::sphere(5.0, 24).to_mesh();
        assert!(is_closed(&mesh));
        let expected = 4.0 / 3.0 * PI * 125.0;
        let volume = signed_volume(&mesh);
        assert!(volume > 0.0);
        assert!(((volume - expected) / expected).abs() < 0.05);
    }

    #[test]
    fn test_cylinder_is_closed_and_outward() {
        let mesh = Primitive::cylinder(10.0, 5.0, 32).to_mesh();
        assert!(is_manifold(&mesh), "Cylinder mesh should be manifold");
        assert!(is_closed(&mesh), "Cylinder mesh should be closed");
        assert_eq!(mesh.vertex_count(), 2 + 2 * 32);
        assert!(signed_volume(&mesh) > 0.0);
    }

    #[test]
    fn test_torus_is_closed_and_outward() {
        let mesh = Primitive::torus(10.0, 3.0, 32).to_mesh();
        assert!(is_closed(&mesh));
        assert!(signed_volume(&mesh) > 0.0);
    }
}
