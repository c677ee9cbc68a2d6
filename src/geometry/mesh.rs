// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Triangle mesh representation and utilities

use super::BoundingBox;
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    /// Vertex whose normal is filled in later by [`Mesh::recompute_normals`]
    pub fn at(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: Vector3::z(),
        }
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }
}

/// Triangular mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Build a mesh from raw positions and index triples, computing normals
    pub fn from_indexed(positions: &[Point3<f64>], faces: &[[usize; 3]]) -> Self {
        let mut mesh = Self::with_capacity(positions.len(), faces.len());
        for position in positions {
            mesh.add_vertex(Vertex::at(*position));
        }
        for face in faces {
            mesh.add_triangle(Triangle::new(*face));
        }
        mesh.recompute_normals();
        mesh
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Translate all vertices
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of a triangle
    pub fn triangle_positions(&self, triangle: &Triangle) -> [Point3<f64>; 3] {
        [
            self.vertices[triangle.indices[0]].position,
            self.vertices[triangle.indices[1]].position,
            self.vertices[triangle.indices[2]].position,
        ]
    }

    /// Total area of all triangles
    pub fn surface_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = self.triangle_positions(t);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    /// Map every vertex to the first earlier vertex within `epsilon` of it.
    ///
    /// Positions are bucketed on a grid of cell size `epsilon` and searched
    /// in the neighbouring cells. Representatives map to themselves, so the
    /// result only depends on vertex order. A non-positive `epsilon` gives
    /// the identity map.
    pub fn weld_map(&self, epsilon: f64) -> Vec<usize> {
        let mut map: Vec<usize> = (0..self.vertices.len()).collect();
        if epsilon <= 0.0 {
            return map;
        }

        let mut grid: AHashMap<(i64, i64, i64), Vec<usize>> = AHashMap::new();
        let cell = |p: &Point3<f64>| {
            (
                (p.x / epsilon).floor() as i64,
                (p.y / epsilon).floor() as i64,
                (p.z / epsilon).floor() as i64,
            )
        };

        for (i, vertex) in self.vertices.iter().enumerate() {
            let pos = vertex.position;
            let (cx, cy, cz) = cell(&pos);

            let mut found = None;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        if let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) {
                            for &j in bucket {
                                if (self.vertices[j].position - pos).norm() < epsilon {
                                    found = Some(j);
                                    break 'search;
                                }
                            }
                        }
                    }
                }
            }

            match found {
                Some(j) => map[i] = j,
                None => grid.entry((cx, cy, cz)).or_default().push(i),
            }
        }

        map
    }

    /// Merge vertices closer than `epsilon` (see [`Mesh::weld_map`]) and
    /// drop triangles that collapse. Returns the number of vertices removed.
    pub fn weld_vertices(&mut self, epsilon: f64) -> usize {
        if self.vertices.is_empty() || epsilon <= 0.0 {
            return 0;
        }

        let map = self.weld_map(epsilon);
        let original_count = self.vertices.len();
        let mut compact = vec![0usize; original_count];
        let mut new_vertices: Vec<Vertex> = Vec::with_capacity(original_count);
        for (i, &rep) in map.iter().enumerate() {
            if rep == i {
                compact[i] = new_vertices.len();
                new_vertices.push(self.vertices[i]);
            }
        }

        let mut new_triangles = Vec::with_capacity(self.triangles.len());
        for triangle in &self.triangles {
            let [a, b, c] = triangle.indices.map(|i| compact[map[i]]);
            if a != b && b != c && a != c {
                new_triangles.push(Triangle::new([a, b, c]));
            }
        }

        self.vertices = new_vertices;
        self.triangles = new_triangles;

        original_count - self.vertices.len()
    }

    /// Recompute vertex normals from triangle geometry
    /// This calculates face normals and averages them at shared vertices
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return;
        }

        let mut normal_sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            let [p0, p1, p2] = self.triangle_positions(triangle);

            // Area-weighted: the unnormalized cross product already carries the area
            let face_normal = (p1 - p0).cross(&(p2 - p0));
            if face_normal.norm() > 1e-12 {
                for &idx in &triangle.indices {
                    normal_sums[idx] += face_normal;
                }
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(normal_sums) {
            vertex.normal = sum.try_normalize(1e-12).unwrap_or_else(Vector3::z);
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
