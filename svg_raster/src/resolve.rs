// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style resolution.
//!
//! Flattens a scope subtree into the list of shapes the rasterizer consumes,
//! combining document presentation attributes with the active overrides. The
//! walk carries an inherited accumulator by value down each recursive call;
//! there is no shared mutable traversal state.
//!
//! Precedence per element and property: id-selector override, then
//! class-selector override, then an override inherited from an ancestor,
//! then the element's own presentation attribute, then the inherited
//! attribute, then the SVG initial value.

use peniko::color::{palette, AlphaColor, Srgb};
use peniko::kurbo::{Affine, BezPath, Rect};

use crate::overrides::{OverrideStore, Property, Value};
use crate::tree::{Element, ElementKind, PaintAttr, SvgTree};

/// The flattened result of resolving one scope: everything the external
/// rasterizer needs, with overrides already folded in.
#[derive(Debug)]
pub struct ResolvedScene {
    /// Shapes in painting order.
    pub shapes: Vec<ResolvedShape>,
    /// The coordinate region the shapes live in, mapped onto the raster.
    pub viewport: Rect,
}

/// One leaf shape with its effective style.
#[derive(Debug)]
pub struct ResolvedShape {
    /// Outline in viewport coordinates (apply `transform` first).
    pub path: BezPath,
    /// Absolute transform from path coordinates to viewport coordinates.
    pub transform: Affine,
    /// Effective fill color, if the shape is filled.
    pub fill: Option<AlphaColor<Srgb>>,
    /// Effective stroke color and width, if the shape is stroked.
    pub stroke: Option<(AlphaColor<Srgb>, f64)>,
    /// Cumulative opacity along the ancestor chain.
    pub opacity: f32,
}

/// Inherited state, passed by value down the recursion.
#[derive(Clone, Copy)]
struct Inherited {
    transform: Affine,
    opacity: f32,
    /// Fill forced by an ancestor override, beating descendant attributes.
    fill_override: Option<AlphaColor<Srgb>>,
    /// Inherited fill attribute; inner `None` is an explicit `fill="none"`.
    fill_attr: Option<Option<AlphaColor<Srgb>>>,
    stroke_override: Option<AlphaColor<Srgb>>,
    stroke_attr: Option<Option<AlphaColor<Srgb>>>,
    stroke_width: f64,
}

impl Default for Inherited {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            opacity: 1.0,
            fill_override: None,
            fill_attr: None,
            stroke_override: None,
            stroke_attr: None,
            stroke_width: 1.0,
        }
    }
}

/// Resolve the full document: every non-symbol shape under the root.
pub(crate) fn resolve_full(tree: &SvgTree, store: &OverrideStore) -> ResolvedScene {
    let size = tree.size();
    let mut shapes = Vec::new();
    walk(&tree.root, Inherited::default(), store, false, &mut shapes);
    ResolvedScene {
        shapes,
        viewport: Rect::new(0.0, 0.0, size.width, size.height),
    }
}

/// Resolve a single element subtree (a symbol or any addressable element).
pub(crate) fn resolve_element(element: &Element, store: &OverrideStore) -> ResolvedScene {
    let viewport = match element.kind {
        ElementKind::Symbol {
            view_box: Some(vb), ..
        } => vb,
        _ => element
            .bounds()
            .unwrap_or_else(|| Rect::new(0.0, 0.0, 1.0, 1.0)),
    };
    let mut shapes = Vec::new();
    walk(element, Inherited::default(), store, true, &mut shapes);
    ResolvedScene { shapes, viewport }
}

fn walk(
    element: &Element,
    inherited: Inherited,
    store: &OverrideStore,
    is_scope_root: bool,
    out: &mut Vec<ResolvedShape>,
) {
    // Symbol definitions only render when they are the scope themselves.
    if matches!(element.kind, ElementKind::Symbol { .. }) && !is_scope_root {
        return;
    }

    let id = element.id.as_deref();
    let own = |property: &Property| store.resolve(id, &element.classes, property);

    let local_transform = match own(&Property::Transform) {
        Some(Value::Transform(t)) => *t,
        _ => element.transform,
    };
    let own_opacity = match own(&Property::Opacity) {
        Some(Value::Scalar(v)) => *v,
        _ => element.opacity,
    };

    let mut state = inherited;
    state.transform = inherited.transform * local_transform;
    state.opacity = inherited.opacity * own_opacity;

    if let Some(Value::Color(c)) = own(&Property::FillColor) {
        state.fill_override = Some(*c);
    }
    if let Some(attr) = element.fill {
        state.fill_attr = Some(match attr {
            PaintAttr::None => None,
            PaintAttr::Color(c) => Some(c),
        });
    }
    if let Some(Value::Color(c)) = own(&Property::StrokeColor) {
        state.stroke_override = Some(*c);
    }
    if let Some(attr) = element.stroke {
        state.stroke_attr = Some(match attr {
            PaintAttr::None => None,
            PaintAttr::Color(c) => Some(c),
        });
    }
    if let Some(width) = element.stroke_width {
        state.stroke_width = width;
    }

    if let ElementKind::Path(path) = &element.kind {
        // SVG initial values: fill is black, stroke is none.
        let fill = state
            .fill_override
            .or_else(|| state.fill_attr.unwrap_or(Some(palette::css::BLACK)));
        let stroke_color = state
            .stroke_override
            .or_else(|| state.stroke_attr.unwrap_or(None));
        out.push(ResolvedShape {
            path: path.clone(),
            transform: state.transform,
            fill,
            stroke: stroke_color.map(|c| (c, state.stroke_width)),
            opacity: state.opacity,
        });
        return;
    }

    for child in &element.children {
        walk(child, state, store, false, out);
    }
}
