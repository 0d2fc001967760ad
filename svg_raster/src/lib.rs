// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached rasterization of SVG documents with per-element style overrides
//! and level-of-detail control.
//!
//! The crate decides *what* to rasterize, *at which effective resolution*,
//! *with which style modifications*, and *whether a previous result can be
//! reused*. Scan conversion itself is a narrow external seam: hosts plug a
//! backend through the [`Rasterizer`] trait, while the built-in
//! [`BoundsRasterizer`] exists for development and tests.
//!
//! [`SvgRaster`] is the primary entry point. It owns a document handle, the
//! override store, the raster cache and the LOD config, and runs the
//! pipeline: resolve scope, compute the effective size, fingerprint the
//! request, and either reuse a cached raster or resolve the style overlay,
//! rasterize, and optionally run a validated shader pass.
//!
//! ```
//! use svg_raster::SvgRaster;
//!
//! let mut svg = SvgRaster::new();
//! svg.load_from_str(
//!     "<svg width='4' height='4'><rect width='4' height='4' fill='red'/></svg>",
//! )?;
//! let raster = svg.rasterize_full((16, 16))?;
//! assert_eq!(raster.width(), 16);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Staleness is tracked with revision counters instead of deep comparisons:
//! reloading the document or mutating an override bumps a revision that is
//! part of every cache fingerprint computed afterwards, so outdated entries
//! simply become unreachable.

pub mod cache;
pub mod document;
pub mod lod;
pub mod overrides;
pub mod pixmap;
pub mod raster;
pub mod resolve;
pub mod shader;
pub mod tree;

use std::path::Path;
use std::sync::Arc;

use log::warn;
use peniko::color::{AlphaColor, Srgb};
use peniko::kurbo::Affine;
use thiserror::Error;

pub use cache::{CacheKey, RasterCache, ScopeKey};
pub use document::{SvgDocument, SymbolInfo};
pub use lod::LodConfig;
pub use overrides::{OverrideStore, Property, Selector, Value};
pub use pixmap::Pixmap;
pub use raster::{BoundsRasterizer, Rasterizer};
pub use resolve::{ResolvedScene, ResolvedShape};
pub use shader::Shader;
pub use tree::SvgTree;

/// Re-export of [`peniko`] (colors, and `peniko::kurbo` for geometry).
pub use peniko;

/// Errors from loading a document.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The source file could not be read.
    #[error("failed to read SVG source")]
    Io(#[from] std::io::Error),
    /// The markup is malformed.
    #[error("malformed SVG markup")]
    Parse(#[from] roxmltree::Error),
    /// The source string is empty.
    #[error("SVG source is empty")]
    Empty,
}

/// Errors from a rasterization request.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No document is loaded.
    #[error("no SVG document loaded")]
    NotLoaded,
    /// A zero-sized raster was requested.
    #[error("invalid raster size {0}x{1}")]
    InvalidSize(u32, u32),
    /// The requested symbol id is absent from the document.
    #[error("unknown symbol {0:?}")]
    UnknownSymbol(String),
    /// The requested element id is absent from the document.
    #[error("unknown element {0:?}")]
    UnknownElement(String),
    /// The rasterization backend failed.
    #[error("rasterizer failed: {0}")]
    Raster(String),
}

/// Errors from the shader post-processor.
///
/// The pipeline recovers these locally with a logged warning and the
/// unshaded raster; they surface only from direct [`shader::apply`] calls.
#[derive(Error, Debug)]
pub enum ShaderError {
    /// The program contains no operations.
    #[error("shader program is empty")]
    EmptyProgram,
    /// The program failed validation.
    #[error("invalid shader program at line {line}: {message}")]
    InvalidProgram {
        /// One-based source line of the offending operation.
        line: usize,
        message: String,
    },
}

/// Errors from setting an override.
#[derive(Error, Debug)]
pub enum OverrideError {
    /// The value's kind does not match the property (for example a raw
    /// string set for a color property). The store is left untouched.
    #[error("type-mismatched value for property {property}")]
    InvalidValue { property: String },
}

/// A rendering scope: the whole document or one addressable element.
enum ScopeRequest<'a> {
    Full,
    Symbol(&'a str),
    Element(&'a str),
}

/// Cached SVG rasterization with style overrides and LOD.
///
/// One instance serves one document at a time. All mutation and rendering
/// goes through `&mut self`, matching the single-threaded-per-document
/// execution model; returned rasters are [`Arc`]s, so cache hits share
/// pixel storage with earlier results.
pub struct SvgRaster<R: Rasterizer = BoundsRasterizer> {
    document: SvgDocument,
    overrides: OverrideStore,
    cache: RasterCache,
    lod: LodConfig,
    rasterizer: R,
}

impl Default for SvgRaster<BoundsRasterizer> {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgRaster<BoundsRasterizer> {
    /// Create an instance backed by the built-in development rasterizer.
    pub fn new() -> Self {
        Self::with_rasterizer(BoundsRasterizer)
    }
}

impl<R: Rasterizer> SvgRaster<R> {
    /// Create an instance backed by a host-provided rasterizer.
    pub fn with_rasterizer(rasterizer: R) -> Self {
        Self {
            document: SvgDocument::new(),
            overrides: OverrideStore::new(),
            cache: RasterCache::new(),
            lod: LodConfig::default(),
            rasterizer,
        }
    }

    // --- loading -----------------------------------------------------------

    /// Load a document from a string, replacing any previous content.
    pub fn load_from_str(&mut self, source: &str) -> Result<(), LoadError> {
        self.document.load_str(source)?;
        self.drop_stale_rasters();
        Ok(())
    }

    /// Load a document from a file, replacing any previous content.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.document.load_file(path)?;
        self.drop_stale_rasters();
        Ok(())
    }

    /// Drop the loaded document. Overrides and cache controls survive.
    pub fn unload(&mut self) {
        self.document.unload();
    }

    /// The underlying document handle.
    pub fn document(&self) -> &SvgDocument {
        &self.document
    }

    // Entries for older revisions are unreachable already; reclaim their
    // memory eagerly.
    fn drop_stale_rasters(&mut self) {
        let current = self.document.revision();
        self.cache
            .invalidate_matching(|key| key.content_revision < current);
    }

    // --- introspection -----------------------------------------------------

    /// Ids of all symbol definitions, in source order.
    pub fn symbol_ids(&self) -> Vec<&str> {
        self.document.symbol_ids()
    }

    /// Whether the document defines a symbol with this id.
    pub fn has_symbol(&self, id: &str) -> bool {
        self.document.has_symbol(id)
    }

    /// Metadata for one symbol; `None` for unknown ids.
    pub fn symbol_info(&self, id: &str) -> Option<SymbolInfo> {
        self.document.symbol_info(id)
    }

    // --- overrides ---------------------------------------------------------

    /// Set an override through the generic store interface.
    pub fn set_override(
        &mut self,
        selector: Selector,
        property: Property,
        value: Value,
    ) -> Result<(), OverrideError> {
        self.overrides.set(selector, property, value)
    }

    /// Override the fill color of the element with this id.
    pub fn override_fill(
        &mut self,
        element_id: &str,
        color: AlphaColor<Srgb>,
    ) -> Result<(), OverrideError> {
        self.set_override(Selector::id(element_id), Property::FillColor, Value::Color(color))
    }

    /// Override the fill color of every element with this class.
    pub fn override_fill_by_class(
        &mut self,
        class: &str,
        color: AlphaColor<Srgb>,
    ) -> Result<(), OverrideError> {
        self.set_override(Selector::class(class), Property::FillColor, Value::Color(color))
    }

    /// Override the stroke color of the element with this id.
    pub fn override_stroke(
        &mut self,
        element_id: &str,
        color: AlphaColor<Srgb>,
    ) -> Result<(), OverrideError> {
        self.set_override(Selector::id(element_id), Property::StrokeColor, Value::Color(color))
    }

    /// Override the stroke color of every element with this class.
    pub fn override_stroke_by_class(
        &mut self,
        class: &str,
        color: AlphaColor<Srgb>,
    ) -> Result<(), OverrideError> {
        self.set_override(Selector::class(class), Property::StrokeColor, Value::Color(color))
    }

    /// Override the opacity of the element with this id (`0..=1`).
    pub fn override_opacity(&mut self, element_id: &str, value: f32) -> Result<(), OverrideError> {
        self.set_override(Selector::id(element_id), Property::Opacity, Value::Scalar(value))
    }

    /// Replace the local transform of the element with this id.
    pub fn override_transform(
        &mut self,
        element_id: &str,
        transform: Affine,
    ) -> Result<(), OverrideError> {
        self.set_override(
            Selector::id(element_id),
            Property::Transform,
            Value::Transform(transform),
        )
    }

    /// Attach a post-process shader to the element with this id.
    ///
    /// The shader runs when that element (or the symbol of that id) is the
    /// scope of a render.
    pub fn override_shader(
        &mut self,
        element_id: &str,
        shader: Shader,
    ) -> Result<(), OverrideError> {
        self.set_override(Selector::id(element_id), Property::Shader, Value::Shader(shader))
    }

    /// Set an override from CSS-style strings.
    ///
    /// Known property names are parsed into their typed values and rejected
    /// with [`OverrideError::InvalidValue`] when malformed; unknown names
    /// are stored raw for forward compatibility and have no rendering
    /// effect.
    pub fn override_css_property(
        &mut self,
        element_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), OverrideError> {
        let property = Property::parse(property);
        let invalid = || OverrideError::InvalidValue {
            property: format!("{property:?}"),
        };
        let value = match &property {
            Property::FillColor | Property::StrokeColor => {
                let color = peniko::color::parse_color(value).map_err(|_| invalid())?;
                Value::Color(color.to_alpha_color())
            }
            Property::Opacity => Value::Scalar(value.trim().parse().map_err(|_| invalid())?),
            Property::Transform => Value::Transform(tree::parse_transform(value)),
            Property::Shader => Value::Shader(Shader::new(value)),
            Property::Custom(_) => Value::Raw(value.to_owned()),
        };
        self.set_override(Selector::id(element_id), property, value)
    }

    /// Remove the fill override for this element id.
    pub fn clear_fill_override(&mut self, element_id: &str) {
        self.overrides
            .clear(&Selector::id(element_id), &Property::FillColor);
    }

    /// Remove the fill override for this class.
    pub fn clear_fill_override_by_class(&mut self, class: &str) {
        self.overrides
            .clear(&Selector::class(class), &Property::FillColor);
    }

    /// Remove the stroke override for this element id.
    pub fn clear_stroke_override(&mut self, element_id: &str) {
        self.overrides
            .clear(&Selector::id(element_id), &Property::StrokeColor);
    }

    /// Remove the stroke override for this class.
    pub fn clear_stroke_override_by_class(&mut self, class: &str) {
        self.overrides
            .clear(&Selector::class(class), &Property::StrokeColor);
    }

    /// Remove the opacity override for this element id.
    pub fn clear_opacity_override(&mut self, element_id: &str) {
        self.overrides
            .clear(&Selector::id(element_id), &Property::Opacity);
    }

    /// Remove the transform override for this element id.
    pub fn clear_transform_override(&mut self, element_id: &str) {
        self.overrides
            .clear(&Selector::id(element_id), &Property::Transform);
    }

    /// Remove the shader override for this element id.
    pub fn clear_shader_override(&mut self, element_id: &str) {
        self.overrides
            .clear(&Selector::id(element_id), &Property::Shader);
    }

    /// Remove the override for one CSS-style property name.
    pub fn clear_css_override(&mut self, element_id: &str, property: &str) {
        self.overrides
            .clear(&Selector::id(element_id), &Property::parse(property));
    }

    /// Remove every override targeting this selector.
    pub fn clear_overrides_for(&mut self, selector: &Selector) {
        self.overrides.clear_all_for(selector);
    }

    /// Remove every override.
    pub fn clear_all_overrides(&mut self) {
        self.overrides.clear_all();
    }

    /// The active override store.
    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    // --- rendering ---------------------------------------------------------

    /// Rasterize the whole document at the requested size.
    pub fn rasterize_full(&mut self, size: (u32, u32)) -> Result<Arc<Pixmap>, RenderError> {
        self.render(ScopeRequest::Full, size, None)
    }

    /// Rasterize one symbol at the requested size.
    ///
    /// Fails with [`RenderError::UnknownSymbol`] when the id names no
    /// symbol in the loaded document.
    pub fn rasterize_symbol(
        &mut self,
        symbol_id: &str,
        size: (u32, u32),
    ) -> Result<Arc<Pixmap>, RenderError> {
        self.render(ScopeRequest::Symbol(symbol_id), size, None)
    }

    /// Rasterize one element with an explicit post-process shader.
    ///
    /// The shader pass is advisory: on a malformed program the unshaded
    /// raster is returned and a warning logged, never an error.
    pub fn rasterize_element_with_shader(
        &mut self,
        element_id: &str,
        size: (u32, u32),
        shader: &Shader,
    ) -> Result<Arc<Pixmap>, RenderError> {
        self.render(ScopeRequest::Element(element_id), size, Some(shader))
    }

    fn render(
        &mut self,
        scope: ScopeRequest<'_>,
        size: (u32, u32),
        explicit_shader: Option<&Shader>,
    ) -> Result<Arc<Pixmap>, RenderError> {
        if size.0 == 0 || size.1 == 0 {
            return Err(RenderError::InvalidSize(size.0, size.1));
        }
        let tree = self.document.tree().ok_or(RenderError::NotLoaded)?;

        let (element, scope_key) = match scope {
            ScopeRequest::Full => (None, ScopeKey::Full),
            ScopeRequest::Symbol(id) => {
                let symbol = tree
                    .symbol(id)
                    .ok_or_else(|| RenderError::UnknownSymbol(id.to_owned()))?;
                (Some(symbol), ScopeKey::Symbol(id.to_owned()))
            }
            ScopeRequest::Element(id) => {
                let element = tree
                    .find(id)
                    .ok_or_else(|| RenderError::UnknownElement(id.to_owned()))?;
                (Some(element), ScopeKey::Symbol(id.to_owned()))
            }
        };

        // A stored shader override participates when the scope names an
        // element; explicit shaders (from the dedicated entry point) win.
        let stored_shader = match (&explicit_shader, &scope_key) {
            (None, ScopeKey::Symbol(id)) => {
                match self.overrides.lookup(&Selector::id(id.clone()), &Property::Shader) {
                    Some(Value::Shader(shader)) => Some(shader.clone()),
                    _ => None,
                }
            }
            _ => None,
        };
        let shader = explicit_shader.cloned().or(stored_shader);

        let effective = self.lod.effective_size(size);
        let key = CacheKey {
            content_revision: self.document.revision(),
            scope: scope_key,
            width: effective.0,
            height: effective.1,
            override_revision: self.overrides.revision(),
            shader: shader.as_ref().map(Shader::identity),
        };

        let overrides = &self.overrides;
        let rasterizer = &self.rasterizer;
        self.cache.get_or_compute(key, || {
            let scene = match element {
                None => resolve::resolve_full(tree, overrides),
                Some(element) => resolve::resolve_element(element, overrides),
            };
            let base = rasterizer.rasterize(&scene, effective)?;
            Ok(match &shader {
                None => base,
                Some(shader) => match shader::apply(&base, shader) {
                    Ok(shaded) => shaded,
                    Err(err) => {
                        warn!("shader pass failed, keeping unshaded raster: {err}");
                        base
                    }
                },
            })
        })
    }

    // --- cache controls ----------------------------------------------------

    /// Enable or disable the raster cache.
    ///
    /// Disabling does not purge stored entries; they become reachable again
    /// after re-enabling. Use [`clear_cache`](Self::clear_cache) to reclaim
    /// memory.
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Number of cached rasters.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cache occupancy in bytes of pixel data.
    pub fn cache_size_bytes(&self) -> usize {
        self.cache.size_bytes()
    }

    /// Drop every cached raster.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Bound the cache's pixel bytes; least-recently-used entries are
    /// evicted past the budget. `None` removes the bound.
    pub fn set_cache_budget(&mut self, max_bytes: Option<usize>) {
        self.cache.set_max_bytes(max_bytes);
    }

    /// The raster cache, for inspection.
    pub fn cache(&self) -> &RasterCache {
        &self.cache
    }

    // --- LOD controls ------------------------------------------------------

    pub fn set_lod_enabled(&mut self, enabled: bool) {
        self.lod.set_enabled(enabled);
    }

    pub fn is_lod_enabled(&self) -> bool {
        self.lod.enabled()
    }

    /// Set the LOD bias factor, clamped to [`lod::BIAS_RANGE`].
    pub fn set_lod_bias(&mut self, bias: f32) {
        self.lod.set_bias(bias);
    }

    pub fn lod_bias(&self) -> f32 {
        self.lod.bias()
    }

    /// The effective render size for a request under the current LOD
    /// config. Pure; callable without side effects.
    pub fn calculate_lod_size(&self, size: (u32, u32)) -> (u32, u32) {
        self.lod.effective_size(size)
    }
}
