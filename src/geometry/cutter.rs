// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Planar cross-section of a triangle mesh
//!
//! The cut is evaluated for a single iso-value (signed distance zero).
//! Coincident mesh vertices are merged first, so surfaces stored with
//! per-face corners chain like shared-vertex ones. Intersection points are
//! then identified topologically, by the merged edge or vertex they lie on,
//! and the output does not depend on triangle order. Closed loops are filled
//! with an ear-clipped triangulation; loops nested an odd number of times
//! become holes of their enclosing loop.

use super::mesh_utils::Edge;
use super::triangulate::{point_in_ring, signed_area2, triangulate_polygon};
use super::{BoundingBox, Mesh, Plane, Triangle, Vertex};
use crate::utils::math::lexicographic_cmp;
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cutter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutOptions {
    /// Signed distances within this fraction of the mesh extent count as on-plane
    pub tolerance: f64,
    /// Generate the filled triangulation of closed loops
    pub generate_triangles: bool,
    /// Vertices closer than this are treated as one point of the surface
    pub weld_tolerance: f64,
}

impl Default for CutOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            generate_triangles: true,
            weld_tolerance: 1e-6,
        }
    }
}

/// One connected polyline of the cross-section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourLoop {
    /// Indices into [`Contour::mesh`] vertices, in traversal order
    pub indices: Vec<usize>,
    pub closed: bool,
}

/// Cross-section geometry: boundary polylines plus fill triangles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    /// Contour points (normal = unit plane normal) and fill triangles
    pub mesh: Mesh,
    pub loops: Vec<ContourLoop>,
}

impl Contour {
    pub fn empty() -> Self {
        Self {
            mesh: Mesh::empty(),
            loops: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn points(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.mesh.vertices.iter().map(|v| &v.position)
    }

    /// Area of the filled cross-section
    pub fn area(&self) -> f64 {
        self.mesh.surface_area()
    }

    /// Total boundary length, closing segments included
    pub fn perimeter(&self) -> f64 {
        let position = |i: usize| self.mesh.vertices[i].position;
        self.loops
            .iter()
            .map(|lp| {
                let n = lp.indices.len();
                let segments = if lp.closed { n } else { n.saturating_sub(1) };
                (0..segments)
                    .map(|k| (position(lp.indices[(k + 1) % n]) - position(lp.indices[k])).norm())
                    .sum::<f64>()
            })
            .sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.mesh.bounding_box()
    }
}

impl Default for Contour {
    fn default() -> Self {
        Self::empty()
    }
}

/// Where a cut point lies on the source mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum CutKey {
    Vertex(usize),
    Edge(Edge),
}

/// Cut `mesh` with `plane` using default options.
///
/// An absent mesh or a degenerate plane yields an empty contour; neither
/// is an error.
pub fn cut(mesh: Option<&Mesh>, plane: &Plane) -> Contour {
    cut_with(mesh, plane, &CutOptions::default())
}

/// Cut `mesh` with `plane`
pub fn cut_with(mesh: Option<&Mesh>, plane: &Plane, options: &CutOptions) -> Contour {
    let Some(mesh) = mesh else {
        return Contour::empty();
    };
    let (Some(normal), Some((u_axis, v_axis))) = (plane.unit_normal(), plane.basis()) else {
        log::debug!("degenerate cutting plane, skipping cut");
        return Contour::empty();
    };
    if mesh.is_empty() {
        return Contour::empty();
    }
    let bbox = mesh.bounding_box();
    if !bbox.intersects_plane(plane) {
        return Contour::empty();
    }

    let tolerance = options.tolerance * bbox.size().norm().max(1.0);
    let distances: Vec<f64> = mesh
        .vertices
        .iter()
        .map(|v| normal.dot(&(v.position - plane.origin)))
        .collect();
    let signs: Vec<i8> = distances
        .iter()
        .map(|&d| {
            if d > tolerance {
                1
            } else if d < -tolerance {
                -1
            } else {
                0
            }
        })
        .collect();

    let merged = mesh.weld_map(options.weld_tolerance);
    let segments = collect_segments(mesh, &merged, &signs);
    if segments.is_empty() {
        return Contour::empty();
    }

    let position = |key: &CutKey| -> Point3<f64> {
        match *key {
            CutKey::Vertex(i) => {
                let p = mesh.vertices[i].position;
                p - normal * distances[i]
            }
            CutKey::Edge(edge) => {
                let (da, db) = (distances[edge.v0], distances[edge.v1]);
                let t = da / (da - db);
                let a = mesh.vertices[edge.v0].position;
                let b = mesh.vertices[edge.v1].position;
                a + (b - a) * t
            }
        }
    };

    let chains = chain_segments(&segments);
    let mut polylines: Vec<(Vec<Point3<f64>>, bool)> = chains
        .into_iter()
        .map(|(keys, closed)| (keys.iter().map(position).collect::<Vec<_>>(), closed))
        .filter(|(points, closed)| points.len() >= if *closed { 3 } else { 2 })
        .collect();

    let project = |p: &Point3<f64>| {
        let d = p - plane.origin;
        Point2::new(d.dot(&u_axis), d.dot(&v_axis))
    };

    // Nesting depth decides outer loops (counter-clockwise about the
    // normal) and holes (clockwise)
    let rings: Vec<Option<Vec<Point2<f64>>>> = polylines
        .iter()
        .map(|(points, closed)| closed.then(|| points.iter().map(project).collect()))
        .collect();
    let depths: Vec<usize> = (0..polylines.len())
        .map(|i| match &rings[i] {
            Some(ring) => rings
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && matches!(other, Some(o) if point_in_ring(&ring[0], o)))
                .count(),
            None => 0,
        })
        .collect();
    for (i, (points, closed)) in polylines.iter_mut().enumerate() {
        if *closed {
            let ccw = signed_area2(rings[i].as_deref().unwrap_or(&[])) > 0.0;
            if ccw != (depths[i] % 2 == 0) {
                points[1..].reverse();
            }
        }
        canonicalize_start(points, *closed);
    }

    let mut order: Vec<usize> = (0..polylines.len()).collect();
    order.sort_by(|&a, &b| lexicographic_cmp(&polylines[a].0[0], &polylines[b].0[0]));

    let mut contour = Contour::empty();
    let mut first_index = vec![0usize; polylines.len()];
    for &i in &order {
        let (points, closed) = &polylines[i];
        first_index[i] = contour.mesh.vertex_count();
        let indices = points
            .iter()
            .map(|p| contour.mesh.add_vertex(Vertex::new(*p, normal)))
            .collect();
        contour.loops.push(ContourLoop {
            indices,
            closed: *closed,
        });
    }

    if polylines.iter().any(|(_, closed)| !closed) {
        log::warn!("cross-section contains open polylines; organ surface is not closed");
    }

    if options.generate_triangles {
        for &outer in &order {
            if !polylines[outer].1 || depths[outer] % 2 == 1 {
                continue;
            }
            let Some(outer_ring) = rings[outer].as_ref() else {
                continue;
            };
            let holes: Vec<usize> = order
                .iter()
                .copied()
                .filter(|&h| {
                    depths[h] == depths[outer] + 1
                        && rings[h]
                            .as_ref()
                            .is_some_and(|ring| point_in_ring(&ring[0], outer_ring))
                })
                .collect();

            let outer_pts: Vec<Point2<f64>> = polylines[outer].0.iter().map(project).collect();
            let hole_pts: Vec<Vec<Point2<f64>>> = holes
                .iter()
                .map(|&h| polylines[h].0.iter().map(project).collect())
                .collect();

            let mut index_map: Vec<usize> = (0..outer_pts.len()).map(|k| first_index[outer] + k).collect();
            for (&h, pts) in holes.iter().zip(&hole_pts) {
                index_map.extend((0..pts.len()).map(|k| first_index[h] + k));
            }

            for [a, b, c] in triangulate_polygon(&outer_pts, &hole_pts) {
                contour
                    .mesh
                    .add_triangle(Triangle::new([index_map[a], index_map[b], index_map[c]]));
            }
        }
    }

    log::debug!(
        "cut produced {} loop(s), {} point(s), {} fill triangle(s)",
        contour.loop_count(),
        contour.mesh.vertex_count(),
        contour.mesh.triangle_count()
    );
    contour
}

/// Intersection segments of every triangle over the merged vertices,
/// deduplicated and sorted
fn collect_segments(mesh: &Mesh, merged: &[usize], signs: &[i8]) -> BTreeSet<(CutKey, CutKey)> {
    let mut segments = BTreeSet::new();

    for triangle in &mesh.triangles {
        let idx = triangle.indices.map(|i| merged[i]);
        if idx[0] == idx[1] || idx[1] == idx[2] || idx[0] == idx[2] {
            continue;
        }
        let s = idx.map(|i| signs[i]);
        let zeros = s.iter().filter(|&&x| x == 0).count();
        if zeros == 3 {
            continue;
        }
        if zeros == 2 {
            // Edge lying in the plane: emitted once, by the triangle on the
            // positive side, so the two faces sharing it do not double it
            if s.iter().any(|&x| x < 0) {
                continue;
            }
        }

        let mut keys: Vec<CutKey> = Vec::with_capacity(3);
        for k in 0..3 {
            let (a, b) = (idx[k], idx[(k + 1) % 3]);
            let (sa, sb) = (s[k], s[(k + 1) % 3]);
            if sa == 0 {
                keys.push(CutKey::Vertex(a));
            } else if sa * sb < 0 {
                keys.push(CutKey::Edge(Edge::new(a, b)));
            }
        }

        if let [first, second] = keys[..] {
            if first != second {
                segments.insert(if first < second {
                    (first, second)
                } else {
                    (second, first)
                });
            }
        }
    }

    segments
}

/// Chain segments into polylines; each entry is (keys, closed)
fn chain_segments(segments: &BTreeSet<(CutKey, CutKey)>) -> Vec<(Vec<CutKey>, bool)> {
    let mut adjacency: BTreeMap<CutKey, BTreeSet<CutKey>> = BTreeMap::new();
    for &(a, b) in segments {
        adjacency.entry(a).or_default().insert(b);
        adjacency.entry(b).or_default().insert(a);
    }

    // Open chain ends first, so open polylines are walked end to end
    let mut starts: Vec<CutKey> = adjacency
        .iter()
        .filter(|(_, n)| n.len() % 2 == 1)
        .map(|(k, _)| *k)
        .collect();
    starts.extend(adjacency.iter().filter(|(_, n)| n.len() % 2 == 0).map(|(k, _)| *k));

    let mut chains = Vec::new();
    for start in starts {
        while let Some(&next) = adjacency.get(&start).and_then(|n| n.iter().next()) {
            let mut keys = vec![start];
            let mut current = start;
            let mut step = Some(next);
            while let Some(next) = step {
                remove_link(&mut adjacency, current, next);
                if next == start {
                    break;
                }
                keys.push(next);
                current = next;
                step = adjacency.get(&current).and_then(|n| n.iter().next().copied());
            }
            let closed = step == Some(start) && keys.len() >= 3;
            chains.push((keys, closed));
        }
    }

    chains
}

fn remove_link(adjacency: &mut BTreeMap<CutKey, BTreeSet<CutKey>>, a: CutKey, b: CutKey) {
    if let Some(n) = adjacency.get_mut(&a) {
        n.remove(&b);
    }
    if let Some(n) = adjacency.get_mut(&b) {
        n.remove(&a);
    }
}

/// Rotate a closed loop to start at its lexicographically smallest point
fn canonicalize_start(points: &mut [Point3<f64>], closed: bool) {
    if !closed || points.is_empty() {
        return;
    }
    let start = (0..points.len())
        .min_by(|&a, &b| lexicographic_cmp(&points[a], &points[b]))
        .unwrap_or(0);
    points.rotate_left(start);
}

/// Unit normal the fill triangles face, if any
pub fn fill_normal(contour: &Contour) -> Option<Vector3<f64>> {
    contour.mesh.vertices.first().map(|v| v.normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{derive_plane, Primitive};
    use approx::assert_relative_eq;

    fn z_plane(z: f64) -> Plane {
        Plane::new(Point3::new(0.0, 0.0, z), Vector3::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn test_absent_mesh_gives_empty_contour() {
        let contour = cut(None, &z_plane(0.0));
        assert!(contour.is_empty());
        assert_eq!(contour.area(), 0.0);
    }

    #[test]
    fn test_degenerate_plane_gives_empty_contour() {
        let cube = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let p = Point3::new(0.0, 0.0, 0.0);
        let contour = cut(Some(&cube), &derive_plane(&p, &p));
        assert!(contour.is_empty());
    }

    #[test]
    fn test_cube_cross_section_is_square() {
        let cube = Primitive::cube(Vector3::new(20.0, 20.0, 20.0), true).to_mesh();
        let plane = derive_plane(&Point3::new(0.0, 0.0, 0.0), &Point3::new(0.0, 0.0, 10.0));
        let contour = cut(Some(&cube), &plane);

        assert_eq!(contour.loop_count(), 1);
        assert!(contour.loops[0].closed);
        assert_relative_eq!(contour.area(), 400.0, epsilon = 1e-9);
        assert_relative_eq!(contour.perimeter(), 80.0, epsilon = 1e-9);
        for p in contour.points() {
            assert_relative_eq!(p.z, 5.0, epsilon = 1e-12);
        }
        let bbox = contour.bounding_box();
        assert_relative_eq!(bbox.size().x, 20.0, epsilon = 1e-12);
        assert_relative_eq!(bbox.size().y, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_outside_mesh_gives_empty_contour() {
        let cube = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), true).to_mesh();
        let contour = cut(Some(&cube), &z_plane(5.0));
        assert!(contour.is_empty());
        assert_eq!(contour.area(), 0.0);
    }

    #[test]
    fn test_fill_faces_along_plane_normal() {
        let cube = Primitive::cube(Vector3::new(4.0, 4.0, 4.0), true).to_mesh();
        let plane = Plane::new(Point3::new(0.0, 0.0, 0.5), Vector3::new(0.0, 0.0, -2.0));
        let contour = cut(Some(&cube), &plane);
        assert!(contour.mesh.triangle_count() > 0);
        for t in &contour.mesh.triangles {
            let [a, b, c] = contour.mesh.triangle_positions(t);
            let n = (b - a).cross(&(c - a));
            assert!(n.z < 0.0);
        }
        assert_eq!(fill_normal(&contour), Some(Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_plane_through_face_with_body_on_positive_side() {
        // In-plane edges are emitted by the triangles on the positive side
        let cube = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let contour = cut(Some(&cube), &z_plane(-1.0));
        assert_eq!(contour.loop_count(), 1);
        assert!(contour.loops[0].closed);
        assert_relative_eq!(contour.area(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_diagonal_plane_through_cube_corners() {
        let cube = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let plane = Plane::new(Point3::origin(), Vector3::new(1.0, -1.0, 0.0));
        let contour = cut(Some(&cube), &plane);
        assert_eq!(contour.loop_count(), 1);
        // Rectangle 2 * sqrt(2) by 2
        assert_relative_eq!(contour.area(), 4.0 * 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_torus_section_has_hole() {
        let torus = Primitive::torus(10.0, 3.0, 48).to_mesh();
        let contour = cut(Some(&torus), &z_plane(0.0));
        assert_eq!(contour.loop_count(), 2);
        // Annulus between radii 7 and 13 (polygonal approximation)
        let expected = std::f64::consts::PI * (13.0f64.powi(2) - 7.0f64.powi(2));
        assert!(((contour.area() - expected) / expected).abs() < 0.02);
    }

    #[test]
    fn test_torus_vertical_section_has_two_disks() {
        let torus = Primitive::torus(10.0, 3.0, 48).to_mesh();
        let plane = Plane::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0));
        let contour = cut(Some(&torus), &plane);
        assert_eq!(contour.loop_count(), 2);
        let expected = 2.0 * std::f64::consts::PI * 9.0;
        assert!(((contour.area() - expected) / expected).abs() < 0.05);
    }

    #[test]
    fn test_cut_ignores_triangle_order() {
        let sphere = Primitive::sphere(5.0, 16).to_mesh();
        let mut shuffled = sphere.clone();
        shuffled.triangles.reverse();
        for t in &mut shuffled.triangles {
            t.indices.rotate_left(1);
        }
        let plane = Plane::new(Point3::new(0.3, -0.2, 1.1), Vector3::new(0.2, 0.4, 1.0));

        assert_eq!(cut(Some(&sphere), &plane), cut(Some(&shuffled), &plane));
    }

    #[test]
    fn test_open_sheet_gives_open_polyline_without_fill() {
        let positions = [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ];
        let sheet = Mesh::from_indexed(&positions, &[[0, 1, 2], [0, 2, 3]]);
        let plane = Plane::new(Point3::origin(), Vector3::new(1.0, 0.3, 0.0));
        let contour = cut(Some(&sheet), &plane);

        assert_eq!(contour.loop_count(), 1);
        assert!(!contour.loops[0].closed);
        assert_eq!(contour.mesh.triangle_count(), 0);
        assert!(contour.perimeter() > 0.0);
    }

    #[test]
    fn test_wire_only_option() {
        let cube = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let options = CutOptions {
            generate_triangles: false,
            ..CutOptions::default()
        };
        let contour = cut_with(Some(&cube), &z_plane(0.25), &options);
        assert_eq!(contour.loop_count(), 1);
        assert_eq!(contour.mesh.triangle_count(), 0);
    }

    /// Same surface with every triangle owning its own corners
    fn split_corners(mesh: &Mesh) -> Mesh {
        let mut split = Mesh::with_capacity(mesh.triangle_count() * 3, mesh.triangle_count());
        for triangle in &mesh.triangles {
            let corners = triangle.indices.map(|i| split.add_vertex(mesh.vertices[i]));
            split.add_triangle(Triangle::new(corners));
        }
        split
    }

    #[test]
    fn test_split_vertex_cube_is_chained_and_filled() {
        let shared = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let split = split_corners(&shared);
        assert_eq!(split.vertex_count(), 36);

        let contour = cut(Some(&split), &z_plane(0.0));
        assert_eq!(contour.loop_count(), 1);
        assert!(contour.loops[0].closed);
        assert_relative_eq!(contour.area(), 4.0, epsilon = 1e-12);
        assert_eq!(contour, cut(Some(&shared), &z_plane(0.0)));

        // Without merging, each face crossing stays a separate piece
        let raw = cut_with(
            Some(&split),
            &z_plane(0.0),
            &CutOptions {
                weld_tolerance: 0.0,
                ..CutOptions::default()
            },
        );
        assert!(raw.loops.iter().all(|l| !l.closed));
        assert_eq!(raw.mesh.triangle_count(), 0);
    }
}
