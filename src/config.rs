// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Pipeline configuration system

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File read by [`PipelineConfig::load`] from the working directory
pub const CONFIG_FILE: &str = "resection.toml";

/// Update pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Surface samples along u
    pub resolution_u: u32,
    /// Surface samples along v
    pub resolution_v: u32,
    /// Radius of the midpoint marker sphere
    pub marker_radius: f64,
    /// Tessellation segments of the marker sphere
    pub marker_segments: u32,
    /// Normals shorter than this make the cutting plane degenerate
    pub plane_epsilon: f64,
    /// Relative signed distance treated as on-plane by the cutter
    pub cut_tolerance: f64,
    /// Distance below which imported organ vertices are merged
    pub weld_tolerance: f64,
    /// Margin assigned to a freshly created control net (mm)
    pub default_resection_margin: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution_u: 40,
            resolution_v: 40,
            marker_radius: 2.0,
            marker_segments: 16,
            plane_epsilon: 1e-9,
            cut_tolerance: 1e-9,
            weld_tolerance: 1e-6,
            default_resection_margin: 10.0,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `resection.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RESECTION_*` overrides obtained from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(resolution) = lookup("RESECTION_RESOLUTION") {
            let resolution: u32 = resolution
                .trim()
                .parse()
                .with_context(|| format!("Invalid RESECTION_RESOLUTION: {resolution:?}"))?;
            self.resolution_u = resolution;
            self.resolution_v = resolution;
        }

        if let Some(radius) = lookup("RESECTION_MARKER_RADIUS") {
            self.marker_radius = radius
                .trim()
                .parse()
                .with_context(|| format!("Invalid RESECTION_MARKER_RADIUS: {radius:?}"))?;
        }

        if let Some(margin) = lookup("RESECTION_MARGIN") {
            self.default_resection_margin = margin
                .trim()
                .parse()
                .with_context(|| format!("Invalid RESECTION_MARGIN: {margin:?}"))?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.resolution_u == 0 || self.resolution_v == 0 {
            bail!(
                "Surface resolution must be at least 1x1, got {}x{}",
                self.resolution_u,
                self.resolution_v
            );
        }
        if !(self.marker_radius.is_finite() && self.marker_radius > 0.0) {
            bail!("Marker radius must be positive, got {}", self.marker_radius);
        }
        for (name, value) in [
            ("plane_epsilon", self.plane_epsilon),
            ("cut_tolerance", self.cut_tolerance),
            ("weld_tolerance", self.weld_tolerance),
            ("default_resection_margin", self.default_resection_margin),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                bail!("{name} must be finite and non-negative, got {value}");
            }
        }
        Ok(())
    }
}
