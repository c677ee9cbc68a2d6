// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Event-driven rebuild of the derived resection geometry
//!
//! Every change notification moves the pipeline `Idle -> Dirty`. Draining
//! the queue runs one `Rebuilding` pass per notification, in delivery
//! order, and returns to `Idle`. A pass refreshes the pick index, derives
//! the plane and midpoint marker, cuts the organ and tessellates the
//! surface. The steps are independent: a skipped step keeps its previously
//! published geometry and never blocks the others.

use crate::config::PipelineConfig;
use crate::geometry::{cut_with, tessellate, Contour, CutOptions, Mesh, Plane, Primitive};
use crate::model::{AnchorPoints, ControlNet, MeshHandle, MeshLookup, PickIndex};
use std::collections::VecDeque;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Dirty,
    Rebuilding,
}

/// Upstream entity whose change triggered a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// Explicit request, e.g. when a view first displays the entity
    FullUpdate,
    ControlNet,
    Anchors,
    TargetOrgan,
}

/// Published output with a generation counter.
///
/// The generation only moves when the stored value actually changes, so
/// the rendering layer can skip redundant redraws.
#[derive(Debug, Clone)]
pub struct Published<T> {
    value: Option<T>,
    generation: u64,
}

impl<T> Default for Published<T> {
    fn default() -> Self {
        Self {
            value: None,
            generation: 0,
        }
    }
}

impl<T: PartialEq> Published<T> {
    /// Replace the stored value; returns whether anything changed
    pub fn publish(&mut self, value: T) -> bool {
        if self.value.as_ref() == Some(&value) {
            return false;
        }
        self.value = Some(value);
        self.generation += 1;
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Receiver of published geometry (the rendering layer)
pub trait GeometrySink {
    fn contour_changed(&mut self, _contour: &Contour, _generation: u64) {}
    fn surface_changed(&mut self, _surface: &Mesh, _generation: u64) {}
    fn marker_changed(&mut self, _marker: &Mesh, _generation: u64) {}
}

/// Sink that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl GeometrySink for NullSink {}

/// Result of one rebuild step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// New geometry replaced the old
    Published,
    /// Recomputed geometry equals what is already published
    Unchanged,
    /// Inputs did not allow the step; prior geometry retained
    Skipped,
}

/// Per-step outcome of a rebuild pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    pub source: ChangeSource,
    pub marker: StepOutcome,
    pub contour: StepOutcome,
    pub surface: StepOutcome,
}

/// Snapshot of everything a rebuild reads
pub struct RebuildInputs<'a> {
    pub net: &'a ControlNet,
    pub anchors: &'a AnchorPoints,
    pub scene: &'a dyn MeshLookup,
}

/// Resolution and net revision of the last tessellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SurfaceKey {
    revision: u64,
    resolution: (u32, u32),
}

/// Update pipeline
pub struct UpdatePipeline {
    config: PipelineConfig,
    state: PipelineState,
    pending: VecDeque<ChangeSource>,
    plane: Option<Plane>,
    pick_index: PickIndex,
    contour: Published<Contour>,
    surface: Published<Mesh>,
    marker: Published<Mesh>,
    contour_organ: Option<MeshHandle>,
    surface_key: Option<SurfaceKey>,
    rebuilds: u64,
}

impl UpdatePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: PipelineState::Idle,
            pending: VecDeque::new(),
            plane: None,
            pick_index: PickIndex::new(),
            contour: Published::default(),
            surface: Published::default(),
            marker: Published::default(),
            contour_organ: None,
            surface_key: None,
            rebuilds: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Change the surface resolution; takes effect on the next rebuild
    pub fn set_resolution(&mut self, resolution_u: u32, resolution_v: u32) {
        self.config.resolution_u = resolution_u;
        self.config.resolution_v = resolution_v;
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of completed rebuild passes
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Plane derived by the last pass that had a valid anchor pair
    pub fn plane(&self) -> Option<&Plane> {
        self.plane.as_ref()
    }

    pub fn pick_index(&self) -> &PickIndex {
        &self.pick_index
    }

    pub fn contour(&self) -> &Published<Contour> {
        &self.contour
    }

    pub fn surface(&self) -> &Published<Mesh> {
        &self.surface
    }

    pub fn marker(&self) -> &Published<Mesh> {
        &self.marker
    }

    /// Queue a change notification.
    ///
    /// Notifications arriving while a pass is running stay queued and are
    /// processed after it, in delivery order.
    pub fn notify(&mut self, source: ChangeSource) {
        log::debug!("change notification: {:?} (state {:?})", source, self.state);
        self.pending.push_back(source);
        if self.state == PipelineState::Idle {
            self.state = PipelineState::Dirty;
        }
    }

    /// Run one rebuild pass per queued notification
    pub fn process(&mut self, inputs: &RebuildInputs<'_>, sink: &mut dyn GeometrySink) -> Vec<RebuildReport> {
        if self.state == PipelineState::Rebuilding {
            return Vec::new();
        }
        let mut reports = Vec::with_capacity(self.pending.len());
        while let Some(source) = self.pending.pop_front() {
            self.state = PipelineState::Rebuilding;
            reports.push(self.rebuild(source, inputs, sink));
        }
        self.state = PipelineState::Idle;
        reports
    }

    fn rebuild(&mut self, source: ChangeSource, inputs: &RebuildInputs<'_>, sink: &mut dyn GeometrySink) -> RebuildReport {
        log::debug!("rebuilding after {:?}", source);

        // Interactive positions are derived from the net, never the reverse
        self.pick_index.sync_from(inputs.net);

        let marker = self.update_plane(inputs.anchors, sink);
        let contour = self.update_contour(inputs, sink);
        let surface = self.update_surface(inputs.net, sink);

        self.rebuilds += 1;
        log::debug!(
            "rebuild done: marker {:?}, contour {:?}, surface {:?}",
            marker,
            contour,
            surface
        );

        RebuildReport {
            source,
            marker,
            contour,
            surface,
        }
    }

    fn update_plane(&mut self, anchors: &AnchorPoints, sink: &mut dyn GeometrySink) -> StepOutcome {
        let Some(plane) = anchors.plane() else {
            log::debug!("{} anchor point(s), plane undefined", anchors.len());
            self.plane = None;
            return StepOutcome::Skipped;
        };
        if plane.is_degenerate_within(self.config.plane_epsilon) {
            log::warn!("anchor points coincide, skipping plane and cut");
            self.plane = None;
            return StepOutcome::Skipped;
        }
        self.plane = Some(plane);

        let mut marker = Primitive::sphere(self.config.marker_radius, self.config.marker_segments).to_mesh();
        marker.translate(&plane.origin.coords);
        if self.marker.publish(marker) {
            if let Some(mesh) = self.marker.get() {
                sink.marker_changed(mesh, self.marker.generation());
            }
            StepOutcome::Published
        } else {
            StepOutcome::Unchanged
        }
    }

    fn update_contour(&mut self, inputs: &RebuildInputs<'_>, sink: &mut dyn GeometrySink) -> StepOutcome {
        // Re-read the organ on every pass; a deleted mesh means no organ
        let handle = inputs.net.target_organ();
        let organ = handle.and_then(|handle| {
            let mesh = inputs.scene.resolve(handle);
            if mesh.is_none() {
                log::debug!("target organ {} no longer exists", handle);
            }
            mesh
        });

        let contour = match (organ, self.plane.as_ref()) {
            (None, _) => Contour::empty(),
            // Without a plane only a section of the same organ may be kept
            (Some(_), None) if self.contour.get().is_none() || self.contour_organ == handle => {
                return StepOutcome::Skipped;
            }
            (Some(_), None) => {
                log::debug!("target organ changed without a cutting plane, clearing contour");
                Contour::empty()
            }
            (Some(mesh), Some(plane)) => {
                let options = CutOptions {
                    tolerance: self.config.cut_tolerance,
                    weld_tolerance: self.config.weld_tolerance,
                    ..CutOptions::default()
                };
                cut_with(Some(mesh.as_ref()), plane, &options)
            }
        };
        self.contour_organ = handle;

        if self.contour.publish(contour) {
            if let Some(contour) = self.contour.get() {
                sink.contour_changed(contour, self.contour.generation());
            }
            StepOutcome::Published
        } else {
            StepOutcome::Unchanged
        }
    }

    fn update_surface(&mut self, net: &ControlNet, sink: &mut dyn GeometrySink) -> StepOutcome {
        let key = SurfaceKey {
            revision: net.modified_count(),
            resolution: (self.config.resolution_u, self.config.resolution_v),
        };
        if self.surface_key == Some(key) && self.surface.get().is_some() {
            return StepOutcome::Unchanged;
        }

        let surface = match tessellate(&net.control_points(), key.resolution.0, key.resolution.1) {
            Ok(mesh) => mesh,
            Err(err) => {
                log::debug!("surface not tessellated: {}", err);
                return StepOutcome::Skipped;
            }
        };
        self.surface_key = Some(key);

        if self.surface.publish(surface) {
            if let Some(mesh) = self.surface.get() {
                sink.surface_changed(mesh, self.surface.generation());
            }
            StepOutcome::Published
        } else {
            StepOutcome::Unchanged
        }
    }
}

impl Default for UpdatePipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
