// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Level-of-detail control.
//!
//! The controller is a pure mapping from a requested raster size to the
//! effective render size. A bias below `1.0` renders smaller than requested
//! (to be upscaled by the consumer, see [`Pixmap::resample`]); a bias above
//! `1.0` renders larger, for consumers anticipating magnification such as
//! high-DPI displays.
//!
//! [`Pixmap::resample`]: crate::pixmap::Pixmap::resample

/// Resolution-reduction policy.
#[derive(Debug, Clone, Copy)]
pub struct LodConfig {
    enabled: bool,
    bias: f32,
}

/// The range `set_bias` clamps to. The pure function itself accepts any
/// positive bias.
pub const BIAS_RANGE: (f32, f32) = (0.1, 4.0);

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bias: 1.0,
        }
    }
}

impl LodConfig {
    /// Whether level-of-detail scaling is active.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The current bias factor.
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Set the bias factor, clamped to [`BIAS_RANGE`].
    pub fn set_bias(&mut self, bias: f32) {
        self.bias = bias.clamp(BIAS_RANGE.0, BIAS_RANGE.1);
    }

    /// The effective render size for a request under this config.
    pub fn effective_size(&self, requested: (u32, u32)) -> (u32, u32) {
        effective_size(requested, self.bias, self.enabled)
    }
}

/// Map a requested size and bias to the effective render size.
///
/// Stateless and always cheap: when disabled the request passes through
/// unchanged, otherwise each dimension is scaled by `bias` and rounded to
/// the nearest integer, never below one pixel. For a fixed bias the result
/// is monotonically non-decreasing in each requested dimension.
pub fn effective_size(requested: (u32, u32), bias: f32, enabled: bool) -> (u32, u32) {
    if !enabled {
        return requested;
    }
    let scale = |dim: u32| ((dim as f64 * bias as f64).round() as u32).max(1);
    (scale(requested.0), scale(requested.1))
}
