// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Organ and control net files driving the kernel

use anyhow::Result;
use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use resection::geometry::{mesh_utils, Primitive};
use resection::{io, ResectionKernel};
use std::f64::consts::PI;
use tempfile::TempDir;

#[test]
fn test_imported_organ_is_cut() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("liver.stl");

    let sphere = Primitive::sphere(30.0, 48).to_mesh();
    io::export_stl(&sphere, &path)?;

    let organ = io::import_stl(&path)?;
    assert_eq!(organ.vertex_count(), sphere.vertex_count());
    assert_eq!(organ.triangle_count(), sphere.triangle_count());
    assert!(mesh_utils::is_closed(&organ));
    assert!(mesh_utils::signed_volume(&organ) > 0.0);

    let mut kernel = ResectionKernel::new();
    let handle = kernel.lookup_mut().insert(organ);
    kernel.set_target_organ(Some(handle));
    kernel.set_anchors(Point3::new(0.0, 0.0, 5.0), Point3::new(0.0, 0.0, 15.0))?;

    let contour = kernel.contour().get().expect("contour published");
    assert_eq!(contour.loop_count(), 1);
    assert!(contour.loops[0].closed);
    let expected = PI * (900.0 - 100.0);
    assert!(((contour.area() - expected) / expected).abs() < 0.01);
    Ok(())
}

#[test]
fn test_contour_export_reimports_as_open_sheet() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("section.stl");

    let mut kernel = ResectionKernel::new();
    let handle = kernel
        .lookup_mut()
        .insert(Primitive::cube(Vector3::new(40.0, 40.0, 40.0), true).to_mesh());
    kernel.set_target_organ(Some(handle));
    kernel.set_anchors(Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, 1.0))?;

    let contour = kernel.contour().get().expect("contour published");
    io::export_stl(&contour.mesh, &path)?;

    let sheet = io::import_stl(&path)?;
    assert!(!mesh_utils::is_closed(&sheet));
    assert_relative_eq!(sheet.surface_area(), 1600.0, epsilon = 1e-3);
    for vertex in &sheet.vertices {
        assert_relative_eq!(vertex.normal, Vector3::z(), epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_control_net_file_drives_surface() -> Result<()> {
    let dir = TempDir::new()?;
    let points_path = dir.path().join("net.txt");
    let surface_path = dir.path().join("surface.txt");

    let mut kernel = ResectionKernel::new();
    let mut points = kernel.control_points();
    for p in &mut points[5..=6] {
        p.z = 30.0;
    }
    io::write_points(&points, &points_path)?;

    let loaded = io::read_points(&points_path)?;
    kernel.set_control_points(&loaded)?;
    assert_eq!(kernel.control_points(), points);

    let surface = kernel.surface().get().expect("surface published").clone();
    assert!(surface.vertices.iter().any(|v| v.position.z > 1.0));

    // Non-.stl extensions are written as ASCII
    io::export_stl(&surface, &surface_path)?;
    assert!(std::fs::read_to_string(&surface_path)?.starts_with("solid resection"));
    let reread = io::import_stl(&surface_path)?;
    assert_eq!(reread.triangle_count(), surface.triangle_count());
    Ok(())
}

#[test]
fn test_malformed_points_file_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken.txt");
    std::fs::write(&path, "1 2 3\n4 five 6\n")?;
    assert!(io::read_points(&path).is_err());
    Ok(())
}
