// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Interactive access to control points
//!
//! [`MarkupEditor`] is the per-point editing surface used by GUI actions
//! (rename, select, hide, delete). It writes straight into the
//! [`ControlNet`], so there is no second copy of the positions to keep in
//! sync. [`PickIndex`] is a read-only snapshot for hit testing, refreshed
//! from the net at the start of every rebuild.

use super::{ControlNet, ControlPoint};
use crate::error::{ResectionError, Result};
use crate::utils::math::is_finite_point;
use nalgebra::Point3;

/// Mutable per-point view over a control net
pub struct MarkupEditor<'a> {
    net: &'a mut ControlNet,
}

impl<'a> MarkupEditor<'a> {
    pub fn new(net: &'a mut ControlNet) -> Self {
        Self { net }
    }

    pub fn len(&self) -> usize {
        self.net.len()
    }

    pub fn is_empty(&self) -> bool {
        self.net.is_empty()
    }

    fn get(&self, index: usize) -> Result<&ControlPoint> {
        self.net.point(index).ok_or(ResectionError::IndexOutOfRange {
            index,
            len: self.net.len(),
        })
    }

    pub fn position(&self, index: usize) -> Result<Point3<f64>> {
        Ok(self.get(index)?.position)
    }

    /// Drag a control point
    pub fn set_position(&mut self, index: usize, position: Point3<f64>) -> Result<()> {
        if !is_finite_point(&position) {
            return Err(ResectionError::NonFiniteCoordinate(index));
        }
        self.net.point_mut(index)?.position = position;
        self.net.mark_modified();
        Ok(())
    }

    pub fn label(&self, index: usize) -> Result<&str> {
        Ok(self.get(index)?.label.as_str())
    }

    pub fn set_label(&mut self, index: usize, label: impl Into<String>) -> Result<()> {
        self.net.point_mut(index)?.label = label.into();
        self.net.mark_modified();
        Ok(())
    }

    pub fn is_selected(&self, index: usize) -> Result<bool> {
        Ok(self.get(index)?.selected)
    }

    pub fn set_selected(&mut self, index: usize, selected: bool) -> Result<()> {
        self.net.point_mut(index)?.selected = selected;
        self.net.mark_modified();
        Ok(())
    }

    /// Select one point and deselect every other
    pub fn select_only(&mut self, index: usize) -> Result<()> {
        self.get(index)?;
        for (i, point) in self.net.points_mut().iter_mut().enumerate() {
            point.selected = i == index;
        }
        self.net.mark_modified();
        Ok(())
    }

    pub fn is_visible(&self, index: usize) -> Result<bool> {
        Ok(self.get(index)?.visible)
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.net.point_mut(index)?.visible = visible;
        self.net.mark_modified();
        Ok(())
    }

    /// Delete a control point. The net becomes incomplete and the surface
    /// is not tessellated until a full point set is supplied again.
    pub fn remove(&mut self, index: usize) -> Result<ControlPoint> {
        self.net.remove_point(index)
    }

    pub fn find_by_label(&self, label: &str) -> Option<usize> {
        self.net.points().iter().position(|p| p.label == label)
    }
}

/// Hit-testing snapshot of the visible control points
#[derive(Debug, Clone, Default)]
pub struct PickIndex {
    entries: Vec<(usize, Point3<f64>)>,
    revision: Option<u64>,
}

impl PickIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from the net; a no-op when the net has not changed
    pub fn sync_from(&mut self, net: &ControlNet) {
        if self.revision == Some(net.modified_count()) {
            return;
        }
        self.entries = net
            .points()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.visible)
            .map(|(i, p)| (i, p.position))
            .collect();
        self.revision = Some(net.modified_count());
    }

    /// Whether the snapshot reflects `net`
    pub fn is_synced_with(&self, net: &ControlNet) -> bool {
        self.revision == Some(net.modified_count())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest visible control point within `radius` of `point`
    pub fn pick(&self, point: &Point3<f64>, radius: f64) -> Option<usize> {
        let radius_squared = radius * radius;
        self.entries
            .iter()
            .map(|(i, p)| (*i, (p - point).norm_squared()))
            .filter(|(_, d)| *d <= radius_squared)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(i, _)| i)
    }
}
