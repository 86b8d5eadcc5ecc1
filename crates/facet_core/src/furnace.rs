//! White furnace integration.
//!
//! Integrates a BRDF against a uniform white environment to get its
//! directional albedo. A physically plausible model never exceeds 1; values
//! well below 1 show energy lost to the shadowing term.

use std::f32::consts::{PI, TAU};

use facet_math::Vec3;
use rayon::prelude::*;

use crate::brdf::{Brdf, ShadingFrame};

/// Default grid resolution per axis (resolution² samples).
pub const DEFAULT_RESOLUTION: u32 = 128;

/// View angles (cosine of the polar angle) sampled by [`FurnaceReport`].
pub const REPORT_VIEW_COSINES: [f32; 4] = [1.0, 0.75, 0.5, 0.25];

/// Directional albedo for a view direction at `cos_theta_v` from the normal.
///
/// Uses a stratified, cosine-weighted grid of `resolution²` light directions
/// so the result is deterministic. Rows are integrated in parallel.
pub fn directional_albedo(brdf: &Brdf, cos_theta_v: f32, resolution: u32) -> Vec3 {
    let resolution = resolution.max(1);
    let frame = ShadingFrame::z_up();

    let cos_v = cos_theta_v.clamp(1.0e-3, 1.0);
    let sin_v = (1.0 - cos_v * cos_v).max(0.0).sqrt();
    let v = Vec3::new(sin_v, 0.0, cos_v);

    let n = resolution as f32;
    let sum: Vec3 = (0..resolution)
        .into_par_iter()
        .map(|i| {
            let u1 = (i as f32 + 0.5) / n;
            let r = u1.sqrt();
            let z = (1.0 - u1).max(0.0).sqrt();
            (0..resolution)
                .map(|j| {
                    let phi = TAU * (j as f32 + 0.5) / n;
                    let l = Vec3::new(r * phi.cos(), r * phi.sin(), z);
                    brdf.evaluate(l, v, &frame)
                })
                .fold(Vec3::ZERO, |acc, f| acc + f)
        })
        .reduce(|| Vec3::ZERO, |a, b| a + b);

    // pdf = cos / pi, so each sample contributes f * pi
    sum * (PI / (n * n))
}

/// Albedo at a handful of view angles.
#[derive(Debug, Clone, PartialEq)]
pub struct FurnaceReport {
    pub samples: Vec<(f32, Vec3)>,
}

impl FurnaceReport {
    pub fn compute(brdf: &Brdf, resolution: u32) -> Self {
        let samples = REPORT_VIEW_COSINES
            .iter()
            .map(|&cos| (cos, directional_albedo(brdf, cos, resolution)))
            .collect();
        Self { samples }
    }

    /// Largest albedo channel across all view angles.
    pub fn max_albedo(&self) -> f32 {
        self.samples
            .iter()
            .map(|(_, albedo)| albedo.max_element())
            .fold(0.0, f32::max)
    }

    /// True when no sample reflects more energy than it receives.
    pub fn conserves_energy(&self, tolerance: f32) -> bool {
        self.max_albedo() <= 1.0 + tolerance
    }
}
