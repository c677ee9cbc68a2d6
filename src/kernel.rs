// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Kernel API for one resection entity

use crate::config::PipelineConfig;
use crate::error::{ResectionError, Result};
use crate::geometry::{Contour, Mesh, Plane};
use crate::model::{AnchorPoints, ControlNet, MarkupEditor, MeshHandle, MeshLookup, MeshScene, PickIndex};
use crate::pipeline::{
    ChangeSource, GeometrySink, NullSink, PipelineState, Published, RebuildInputs, RebuildReport, UpdatePipeline,
};
use nalgebra::Point3;

/// Owns the control net, anchors and update pipeline of a resection.
///
/// Meshes are referenced through the lookup `L`; every mutation runs the
/// rebuild synchronously before returning.
pub struct ResectionKernel<L: MeshLookup = MeshScene> {
    net: ControlNet,
    anchors: AnchorPoints,
    pipeline: UpdatePipeline,
    lookup: L,
    sink: Box<dyn GeometrySink>,
}

impl ResectionKernel<MeshScene> {
    /// Kernel with default configuration and an empty in-memory scene
    pub fn new() -> Self {
        Self::with_lookup(PipelineConfig::default(), MeshScene::new())
    }
}

impl<L: MeshLookup> ResectionKernel<L> {
    pub fn with_lookup(config: PipelineConfig, lookup: L) -> Self {
        Self {
            net: ControlNet::with_config(&config),
            anchors: AnchorPoints::new(),
            pipeline: UpdatePipeline::new(config),
            lookup,
            sink: Box::new(NullSink),
        }
    }

    /// Route published geometry to the rendering layer
    pub fn set_sink(&mut self, sink: Box<dyn GeometrySink>) {
        self.sink = sink;
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Host object table; call [`ResectionKernel::on_change`] with
    /// [`ChangeSource::TargetOrgan`] after editing referenced meshes
    pub fn lookup_mut(&mut self) -> &mut L {
        &mut self.lookup
    }

    pub fn net(&self) -> &ControlNet {
        &self.net
    }

    pub fn anchors(&self) -> &AnchorPoints {
        &self.anchors
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Rebuild everything; used when a view first displays the entity
    pub fn full_update(&mut self) -> Vec<RebuildReport> {
        self.on_change(ChangeSource::FullUpdate)
    }

    /// Incremental update after `source` changed
    pub fn on_change(&mut self, source: ChangeSource) -> Vec<RebuildReport> {
        self.pipeline.notify(source);
        let inputs = RebuildInputs {
            net: &self.net,
            anchors: &self.anchors,
            scene: &self.lookup,
        };
        self.pipeline.process(&inputs, self.sink.as_mut())
    }

    /// Replace the control grid (row-major, 16 points)
    pub fn set_control_points(&mut self, points: &[Point3<f64>]) -> Result<()> {
        self.net.set_control_points(points)?;
        self.on_change(ChangeSource::ControlNet);
        Ok(())
    }

    pub fn control_points(&self) -> Vec<Point3<f64>> {
        self.net.control_points()
    }

    /// Apply per-point GUI edits, then rebuild if anything changed
    pub fn edit_markups<R>(&mut self, edit: impl FnOnce(&mut MarkupEditor<'_>) -> R) -> R {
        let before = self.net.modified_count();
        let result = edit(&mut MarkupEditor::new(&mut self.net));
        if self.net.modified_count() != before {
            self.on_change(ChangeSource::ControlNet);
        }
        result
    }

    pub fn pick_index(&self) -> &PickIndex {
        self.pipeline.pick_index()
    }

    pub fn set_target_organ(&mut self, organ: Option<MeshHandle>) {
        self.net.set_target_organ(organ);
        self.on_change(ChangeSource::TargetOrgan);
    }

    pub fn add_target_tumor(&mut self, tumor: MeshHandle) -> bool {
        let added = self.net.add_target_tumor(tumor);
        if added {
            self.on_change(ChangeSource::ControlNet);
        }
        added
    }

    pub fn remove_target_tumor(&mut self, tumor: MeshHandle) -> bool {
        let removed = self.net.remove_target_tumor(tumor);
        if removed {
            self.on_change(ChangeSource::ControlNet);
        }
        removed
    }

    pub fn number_of_target_tumors(&self) -> usize {
        self.net.number_of_target_tumors()
    }

    pub fn set_resection_margin(&mut self, margin: f64) -> Result<()> {
        self.net.set_resection_margin(margin)?;
        self.on_change(ChangeSource::ControlNet);
        Ok(())
    }

    /// Place both anchors at once
    pub fn set_anchors(&mut self, p1: Point3<f64>, p2: Point3<f64>) -> Result<()> {
        let mut anchors = AnchorPoints::new();
        anchors.push(p1)?;
        anchors.push(p2)?;
        self.anchors = anchors;
        self.on_change(ChangeSource::Anchors);
        Ok(())
    }

    /// Anchor moved by the interaction layer
    pub fn move_anchor(&mut self, index: usize, point: Point3<f64>) -> Result<()> {
        self.anchors.set(index, point)?;
        self.on_change(ChangeSource::Anchors);
        Ok(())
    }

    pub fn add_anchor(&mut self, point: Point3<f64>) -> Result<()> {
        self.anchors.push(point)?;
        self.on_change(ChangeSource::Anchors);
        Ok(())
    }

    pub fn remove_anchor(&mut self, index: usize) -> Result<Point3<f64>> {
        let removed = self.anchors.remove(index)?;
        self.on_change(ChangeSource::Anchors);
        Ok(removed)
    }

    /// Lay the control grid flat on the cutting plane
    pub fn initialize_surface_from_anchors(&mut self, half_extent: f64) -> Result<()> {
        let plane = self
            .anchors
            .plane()
            .ok_or_else(|| ResectionError::InvalidArgument("Exactly two anchor points are required".into()))?;
        self.net.fit_to_plane(&plane, half_extent)?;
        self.on_change(ChangeSource::ControlNet);
        Ok(())
    }

    pub fn set_resolution(&mut self, resolution_u: u32, resolution_v: u32) -> Result<()> {
        if resolution_u == 0 || resolution_v == 0 {
            return Err(ResectionError::InvalidArgument(format!(
                "Resolution must be at least 1x1, got {resolution_u}x{resolution_v}"
            )));
        }
        self.pipeline.set_resolution(resolution_u, resolution_v);
        self.on_change(ChangeSource::FullUpdate);
        Ok(())
    }

    pub fn plane(&self) -> Option<&Plane> {
        self.pipeline.plane()
    }

    pub fn contour(&self) -> &Published<Contour> {
        self.pipeline.contour()
    }

    pub fn surface(&self) -> &Published<Mesh> {
        self.pipeline.surface()
    }

    pub fn marker(&self) -> &Published<Mesh> {
        self.pipeline.marker()
    }
}

impl Default for ResectionKernel<MeshScene> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    #[test]
    fn test_kernel_basic_update() {
        let mut kernel = ResectionKernel::new();
        let reports = kernel.full_update();
        assert_eq!(reports.len(), 1);
        assert_eq!(kernel.state(), PipelineState::Idle);

        let surface = kernel.surface().get().unwrap();
        assert_eq!(surface.vertex_count(), 41 * 41);
        assert_eq!(surface.triangle_count(), 2 * 40 * 40);
        assert!(kernel.contour().get().unwrap().is_empty());
        assert!(kernel.marker().get().is_none());
    }

    #[test]
    fn test_kernel_organ_and_anchors() {
        let mut kernel = ResectionKernel::new();
        let organ = kernel
            .lookup_mut()
            .insert(Primitive::cube(Vector3::new(20.0, 20.0, 20.0), true).to_mesh());
        kernel.set_target_organ(Some(organ));
        kernel
            .set_anchors(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 10.0))
            .unwrap();

        let contour = kernel.contour().get().unwrap();
        assert_eq!(contour.loop_count(), 1);
        assert_eq!(kernel.plane().map(|p| p.origin), Some(Point3::new(0.0, 0.0, 5.0)));

        // Plane at z = -15 misses the cube
        kernel.move_anchor(1, Point3::new(0.0, 0.0, -30.0)).unwrap();
        assert!(kernel.contour().get().unwrap().is_empty());
        assert_eq!(kernel.contour().generation(), 2);
    }

    #[test]
    fn test_initialize_surface_from_anchors() {
        let mut kernel = ResectionKernel::new();
        assert!(kernel.initialize_surface_from_anchors(50.0).is_err());

        kernel
            .set_anchors(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0))
            .unwrap();
        kernel.initialize_surface_from_anchors(50.0).unwrap();

        let surface = kernel.surface().get().unwrap();
        for vertex in &surface.vertices {
            assert!((vertex.position.x - 5.0).abs() < 1e-9);
            assert!((vertex.normal - Vector3::x()).norm() < 1e-9);
        }
    }

    #[test]
    fn test_edit_markups_triggers_rebuild_only_on_change() {
        let mut kernel = ResectionKernel::new();
        kernel.full_update();
        let generation = kernel.surface().generation();

        let label = kernel.edit_markups(|m| m.label(0).map(str::to_owned));
        assert_eq!(label.as_deref(), Ok("C-0"));
        assert_eq!(kernel.surface().generation(), generation);

        kernel
            .edit_markups(|m| m.set_position(5, Point3::new(-33.0, -33.0, 20.0)))
            .unwrap();
        assert_eq!(kernel.surface().generation(), generation + 1);
        assert_eq!(kernel.pick_index().pick(&Point3::new(-33.0, -33.0, 20.0), 0.1), Some(5));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut kernel = ResectionKernel::new();
        assert!(kernel.set_resolution(0, 10).is_err());
        kernel.set_resolution(2, 3).unwrap();
        assert_eq!(kernel.surface().get().map(|m| m.triangle_count()), Some(12));
    }
}
