// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Cross-section properties on closed primitives

use anyhow::Result;
use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use resection::geometry::{cut, derive_plane, fill_normal, Mesh, Plane, Primitive, Triangle};
use std::f64::consts::PI;

fn permuted(mesh: &Mesh) -> Mesh {
    // Interleave the triangle list and rotate each triangle's corners
    let mut triangles: Vec<Triangle> = mesh
        .triangles
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .chain(mesh.triangles.iter().enumerate().filter(|(i, _)| i % 2 == 0))
        .map(|(_, t)| *t)
        .collect();
    for t in &mut triangles {
        t.indices.rotate_right(1);
    }
    Mesh {
        vertices: mesh.vertices.clone(),
        triangles,
    }
}

#[test]
fn test_cut_never_raises_on_degenerate_input() {
    let p = Point3::new(4.0, 4.0, 4.0);
    let degenerate = derive_plane(&p, &p);
    assert_eq!(degenerate.normal.norm(), 0.0);

    let sphere = Primitive::sphere(5.0, 12).to_mesh();
    assert!(cut(Some(&sphere), &degenerate).is_empty());
    assert!(cut(None, &degenerate).is_empty());
    assert!(cut(None, &derive_plane(&Point3::origin(), &p)).is_empty());
    assert!(cut(Some(&Mesh::empty()), &derive_plane(&Point3::origin(), &p)).is_empty());
}

#[test]
fn test_cylinder_section_is_disk() {
    let cylinder = Primitive::cylinder(20.0, 5.0, 64).to_mesh();
    let plane = Plane::new(Point3::new(0.0, 0.0, 3.3), Vector3::z());
    let contour = cut(Some(&cylinder), &plane);

    assert_eq!(contour.loop_count(), 1);
    // Regular 64-gon inscribed in radius 5
    let expected = 0.5 * 64.0 * 25.0 * (2.0 * PI / 64.0).sin();
    assert_relative_eq!(contour.area(), expected, epsilon = 1e-9);
    assert_eq!(fill_normal(&contour), Some(Vector3::z()));
}

#[test]
fn test_oblique_sphere_section() {
    let sphere = Primitive::sphere(10.0, 64).to_mesh();
    let plane = derive_plane(&Point3::new(-1.0, 2.0, 0.0), &Point3::new(1.0, 2.0, 3.0));
    let contour = cut(Some(&sphere), &plane);

    assert_eq!(contour.loop_count(), 1);
    assert!(contour.loops[0].closed);

    let d = plane.signed_distance(&Point3::origin()).abs();
    let expected = PI * (100.0 - d * d);
    assert!(((contour.area() - expected) / expected).abs() < 0.01);

    // All contour points lie on the plane
    for p in contour.points() {
        assert!(plane.signed_distance(p).abs() < 1e-9);
    }
}

#[test]
fn test_cut_is_independent_of_traversal_order() {
    for mesh in [
        Primitive::sphere(7.0, 20).to_mesh(),
        Primitive::torus(10.0, 3.0, 24).to_mesh(),
        Primitive::cube(Vector3::new(6.0, 6.0, 6.0), true).to_mesh(),
    ] {
        let plane = Plane::new(Point3::new(0.1, 0.2, 0.3), Vector3::new(0.3, -0.1, 1.0));
        assert_eq!(cut(Some(&mesh), &plane), cut(Some(&permuted(&mesh)), &plane));
    }
}

#[test]
fn test_repeated_cuts_are_identical() -> Result<()> {
    let torus = Primitive::torus(10.0, 3.0, 40).to_mesh();
    let plane = Plane::new(Point3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.2, 1.0));
    let first = serde_json::to_vec(&cut(Some(&torus), &plane))?;
    let second = serde_json::to_vec(&cut(Some(&torus), &plane))?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_flipping_plane_mirrors_fill_orientation() {
    let cube = Primitive::cube(Vector3::new(8.0, 8.0, 8.0), true).to_mesh();
    let up = derive_plane(&Point3::new(0.0, 0.0, -1.0), &Point3::new(0.0, 0.0, 1.0));
    let down = derive_plane(&Point3::new(0.0, 0.0, 1.0), &Point3::new(0.0, 0.0, -1.0));

    let a = cut(Some(&cube), &up);
    let b = cut(Some(&cube), &down);
    assert_relative_eq!(a.area(), b.area(), epsilon = 1e-9);
    assert_relative_eq!(a.perimeter(), b.perimeter(), epsilon = 1e-9);
    assert_eq!(fill_normal(&a), Some(Vector3::z()));
    assert_eq!(fill_normal(&b), Some(-Vector3::z()));
}

#[test]
fn test_two_separate_bodies_give_two_loops() {
    let mut mesh = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
    let mut other = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
    other.translate(&Vector3::new(5.0, 0.0, 0.0));
    let offset = mesh.vertex_count();
    mesh.vertices.extend(other.vertices);
    mesh.triangles
        .extend(other.triangles.iter().map(|t| Triangle::new(t.indices.map(|i| i + offset))));

    let contour = cut(Some(&mesh), &Plane::new(Point3::origin(), Vector3::z()));
    assert_eq!(contour.loop_count(), 2);
    assert_relative_eq!(contour.area(), 8.0, epsilon = 1e-9);
    let bbox = contour.bounding_box();
    assert_relative_eq!(bbox.size().x, 7.0, epsilon = 1e-12);
}
