// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! STL import and export

use crate::geometry::{mesh_utils, Mesh, Triangle, Vertex};
use anyhow::{Context, Result};
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Merge distance used by [`import_stl`]
pub const DEFAULT_WELD_TOLERANCE: f64 = 1e-6;

/// Load an STL file as a shared-vertex mesh with recomputed normals
pub fn import_stl(path: impl AsRef<Path>) -> Result<Mesh> {
    import_stl_with(path, DEFAULT_WELD_TOLERANCE)
}

/// Load an STL file, merging vertices closer than `weld_tolerance`
pub fn import_stl_with(path: impl AsRef<Path>, weld_tolerance: f64) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open STL file: {:?}", path))?;
    let stl = stl_io::read_stl(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read STL file: {:?}", path))?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.add_vertex(Vertex::at(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)));
    }
    for face in &stl.faces {
        mesh.add_triangle(Triangle::new(face.vertices));
    }

    let merged = mesh.weld_vertices(weld_tolerance);
    mesh.recompute_normals();

    log::info!(
        "Loaded {:?}: {} vertices, {} triangles ({} merged)",
        path,
        mesh.vertex_count(),
        mesh.triangle_count(),
        merged
    );
    if !mesh_utils::is_closed(&mesh) {
        log::warn!(
            "{:?} is not a closed surface ({} boundary edges)",
            path,
            mesh_utils::boundary_edge_count(&mesh)
        );
    }

    Ok(mesh)
}

/// Export a mesh as STL; binary for `.stl`, ASCII for any other extension
pub fn export_stl(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let binary = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("stl"));
    if binary {
        export_stl_binary(mesh, path)
    } else {
        export_stl_ascii(mesh, path)
    }
}

fn facet_normal(mesh: &Mesh, triangle: &Triangle) -> [f32; 3] {
    let [a, b, c] = mesh.triangle_positions(triangle);
    let n = (b - a)
        .cross(&(c - a))
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(nalgebra::Vector3::zeros);
    [n.x as f32, n.y as f32, n.z as f32]
}

fn export_stl_binary(mesh: &Mesh, path: &Path) -> Result<()> {
    use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

    let triangles: Vec<StlTriangle> = mesh
        .triangles
        .iter()
        .map(|tri| {
            let corners = mesh
                .triangle_positions(tri)
                .map(|p| StlVertex::new([p.x as f32, p.y as f32, p.z as f32]));
            StlTriangle {
                normal: Normal::new(facet_normal(mesh, tri)),
                vertices: corners,
            }
        })
        .collect();

    let file = File::create(path).with_context(|| format!("Failed to create STL file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    stl_io::write_stl(&mut writer, triangles.iter()).context("Failed to write STL file")?;
    writer.flush().context("Failed to write STL file")?;

    Ok(())
}

fn export_stl_ascii(mesh: &Mesh, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create STL file: {:?}", path))?;
    let mut file = BufWriter::new(file);

    writeln!(file, "solid resection")?;
    for tri in &mesh.triangles {
        let [nx, ny, nz] = facet_normal(mesh, tri);
        writeln!(file, "  facet normal {} {} {}", nx, ny, nz)?;
        writeln!(file, "    outer loop")?;
        for p in mesh.triangle_positions(tri) {
            writeln!(file, "      vertex {} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(file, "    endloop")?;
        writeln!(file, "  endfacet")?;
    }
    writeln!(file, "endsolid resection")?;
    file.flush()?;

    Ok(())
}
