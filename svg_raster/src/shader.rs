// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Post-raster shading.
//!
//! A [`Shader`] is a small program of CPU color transforms applied to a
//! finished raster. Programs are validated before execution; the pipeline
//! treats a failing shader as advisory and falls back to the unshaded
//! raster. Because shaded results go through the cache keyed by the shader's
//! identity, repeated identical requests are not re-processed.
//!
//! The program syntax is one operation per line, `#` starting a comment:
//!
//! ```text
//! # warm tint at reduced strength
//! tint #ffcc88
//! fade 0.9
//! ```
//!
//! Supported operations: `grayscale`, `invert`, `tint <color>`,
//! `fade <0..=1>`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use peniko::color::{parse_color, AlphaColor, Srgb};

use crate::pixmap::Pixmap;
use crate::ShaderError;

/// A post-process shader program.
#[derive(Debug, Clone)]
pub struct Shader {
    source: String,
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    Grayscale,
    Invert,
    Tint(AlphaColor<Srgb>),
    Fade(f32),
}

impl Shader {
    /// Create a shader from program source. Validation happens on use, or
    /// eagerly through [`validate`](Self::validate).
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The program source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// A stable identity for cache fingerprints: equal sources always hash
    /// equal, so identical (scope, size, shader) requests share a raster.
    pub fn identity(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.source.hash(&mut hasher);
        hasher.finish()
    }

    /// Check the program is well-formed without running it.
    pub fn validate(&self) -> Result<(), ShaderError> {
        self.compile().map(|_| ())
    }

    fn compile(&self) -> Result<Vec<Effect>, ShaderError> {
        let mut effects = Vec::new();
        for (idx, raw) in self.source.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            let (op, arg) = match line.split_once(char::is_whitespace) {
                Some((op, arg)) => (op, arg.trim()),
                None => (line, ""),
            };
            let invalid = |message: String| ShaderError::InvalidProgram {
                line: idx + 1,
                message,
            };
            let effect = match op {
                "grayscale" => Effect::Grayscale,
                "invert" => Effect::Invert,
                "tint" => {
                    let color = parse_color(arg)
                        .map_err(|e| invalid(format!("bad tint color {arg:?}: {e}")))?;
                    Effect::Tint(color.to_alpha_color())
                }
                "fade" => {
                    let alpha: f32 = arg
                        .parse()
                        .map_err(|_| invalid(format!("bad fade amount {arg:?}")))?;
                    if !(0.0..=1.0).contains(&alpha) {
                        return Err(invalid(format!("fade amount {alpha} outside 0..=1")));
                    }
                    Effect::Fade(alpha)
                }
                other => return Err(invalid(format!("unknown operation {other:?}"))),
            };
            effects.push(effect);
        }
        if effects.is_empty() {
            return Err(ShaderError::EmptyProgram);
        }
        Ok(effects)
    }
}

// A `#` starts a comment only at the head of a line or standing alone
// between whitespace; a `#` glued to a word stays, so hex color arguments
// like `tint #ffcc88` survive.
fn strip_comment(raw: &str) -> &str {
    for (i, _) in raw.match_indices('#') {
        let preceded = raw[..i].chars().next_back().map_or(true, char::is_whitespace);
        let followed = raw[i + 1..].chars().next().map_or(true, char::is_whitespace);
        if preceded && followed {
            return &raw[..i];
        }
    }
    raw
}

/// Run a shader over a raster, yielding the shaded copy.
///
/// The base raster is never mutated; a malformed program fails before any
/// pixel work happens.
pub fn apply(base: &Pixmap, shader: &Shader) -> Result<Pixmap, ShaderError> {
    let effects = shader.compile()?;
    let mut out = base.clone();
    for effect in effects {
        run_effect(&mut out, effect);
    }
    Ok(out)
}

fn run_effect(pixmap: &mut Pixmap, effect: Effect) {
    match effect {
        Effect::Grayscale => {
            for p in pixmap.data_mut() {
                // Integer Rec. 709 luma approximation.
                let luma = ((u32::from(p.r) * 54 + u32::from(p.g) * 183 + u32::from(p.b) * 19)
                    >> 8) as u8;
                p.r = luma;
                p.g = luma;
                p.b = luma;
            }
        }
        Effect::Invert => {
            for p in pixmap.data_mut() {
                p.r = 255 - p.r;
                p.g = 255 - p.g;
                p.b = 255 - p.b;
            }
        }
        Effect::Tint(color) => {
            let tint = color.to_rgba8();
            let mul = |a: u8, b: u8| ((u16::from(a) * u16::from(b)) / 255) as u8;
            for p in pixmap.data_mut() {
                p.r = mul(p.r, tint.r);
                p.g = mul(p.g, tint.g);
                p.b = mul(p.b, tint.b);
                p.a = mul(p.a, tint.a);
            }
        }
        Effect::Fade(alpha) => {
            let alpha = (alpha * 255.0).round() as u16;
            for p in pixmap.data_mut() {
                p.a = ((u16::from(p.a) * alpha) / 255) as u8;
            }
        }
    }
}
