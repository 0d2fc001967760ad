// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A minimal SVG document model.
//!
//! This parser covers just enough of SVG to feed the override resolver and
//! the rasterizer seam: groups, symbols, paths and a few basic shapes, with
//! ids, classes, presentation attributes and transforms. It is deliberately
//! not a conformant SVG implementation; hosts with richer documents are
//! expected to plug their own rasterization backend.

use log::warn;
use peniko::color::{palette, parse_color, AlphaColor, Srgb};
use peniko::kurbo::{Affine, BezPath, Circle, Point, Rect, Shape, Size, Vec2};
use roxmltree::{Document, Node};
use smallvec::SmallVec;

/// A parsed SVG document.
#[derive(Debug)]
pub struct SvgTree {
    pub(crate) root: Element,
    size: Size,
    symbol_order: Vec<String>,
}

/// One element of the document tree.
#[derive(Debug)]
pub(crate) struct Element {
    pub(crate) id: Option<String>,
    pub(crate) classes: SmallVec<[String; 2]>,
    pub(crate) transform: Affine,
    pub(crate) fill: Option<PaintAttr>,
    pub(crate) stroke: Option<PaintAttr>,
    pub(crate) stroke_width: Option<f64>,
    pub(crate) opacity: f32,
    pub(crate) kind: ElementKind,
    pub(crate) children: Vec<Element>,
}

#[derive(Debug)]
pub(crate) enum ElementKind {
    Group,
    Symbol { view_box: Option<Rect> },
    Path(BezPath),
}

/// A `fill`/`stroke` presentation attribute. The outer `Option` on
/// [`Element`] distinguishes "not specified" (inherited) from this.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PaintAttr {
    /// An explicit `none`.
    None,
    Color(AlphaColor<Srgb>),
}

impl SvgTree {
    /// Parse an SVG document from a string.
    pub fn parse(xml: &str) -> Result<Self, roxmltree::Error> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();

        let root_width = root.attribute("width").and_then(|s| s.parse::<f64>().ok());
        let root_height = root.attribute("height").and_then(|s| s.parse::<f64>().ok());
        let view_box = root.attribute("viewBox").and_then(parse_view_box);
        let (origin, viewbox_size) = view_box
            .map(|vb| (vb.origin(), vb.size()))
            .unzip();

        let mut transform = if let Some(origin) = origin {
            Affine::translate(origin.to_vec2() * -1.0)
        } else {
            Affine::IDENTITY
        };
        transform = match (root_width, root_height, viewbox_size) {
            (Some(w), Some(h), Some(s)) => {
                Affine::scale_non_uniform(w / s.width, h / s.height) * transform
            }
            (Some(w), None, Some(s)) => Affine::scale(w / s.width) * transform,
            (None, Some(h), Some(s)) => Affine::scale(h / s.height) * transform,
            _ => transform,
        };

        let size = match (root_width, root_height, viewbox_size) {
            (None, None, Some(s)) => s,
            (mw, mh, None) => Size {
                width: mw.unwrap_or(300.0),
                height: mh.unwrap_or(150.0),
            },
            (Some(w), None, Some(s)) => Size {
                width: w,
                height: w / s.width * s.height,
            },
            (None, Some(h), Some(s)) => Size {
                width: h / s.height * s.width,
                height: h,
            },
            (Some(width), Some(height), Some(_)) => Size { width, height },
        };

        let mut symbol_order = Vec::new();
        let mut children = Vec::new();
        for node in root.children() {
            if let Some(elem) = parse_element(node, &mut symbol_order) {
                children.push(elem);
            }
        }
        let root = Element {
            id: root.attribute("id").map(str::to_owned),
            classes: SmallVec::new(),
            transform,
            fill: None,
            stroke: None,
            stroke_width: None,
            opacity: 1.0,
            kind: ElementKind::Group,
            children,
        };
        Ok(Self {
            root,
            size,
            symbol_order,
        })
    }

    /// The intrinsic size of the document, from `width`/`height`/`viewBox`.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Ids of all `<symbol>` definitions, in source order.
    pub fn symbol_ids(&self) -> impl Iterator<Item = &str> {
        self.symbol_order.iter().map(String::as_str)
    }

    /// Whether a `<symbol>` with the given id exists.
    pub fn has_symbol(&self, id: &str) -> bool {
        self.symbol_order.iter().any(|s| s == id)
    }

    /// Find the symbol element with the given id.
    pub(crate) fn symbol(&self, id: &str) -> Option<&Element> {
        find_by_id(&self.root, id)
            .filter(|e| matches!(e.kind, ElementKind::Symbol { .. }))
    }

    /// Find any element with the given id.
    pub(crate) fn find(&self, id: &str) -> Option<&Element> {
        find_by_id(&self.root, id)
    }
}

impl Element {
    /// The union of this element's shape bounds in its parent's coordinates.
    pub(crate) fn bounds(&self) -> Option<Rect> {
        let mut acc: Option<Rect> = None;
        if let ElementKind::Path(path) = &self.kind {
            acc = Some(path.bounding_box());
        }
        for child in &self.children {
            if let Some(b) = child.bounds() {
                acc = Some(match acc {
                    Some(a) => a.union(b),
                    None => b,
                });
            }
        }
        acc.map(|b| self.transform.transform_rect_bbox(b))
    }
}

fn find_by_id<'a>(elem: &'a Element, id: &str) -> Option<&'a Element> {
    if elem.id.as_deref() == Some(id) {
        return Some(elem);
    }
    elem.children.iter().find_map(|c| find_by_id(c, id))
}

fn parse_element(node: Node<'_, '_>, symbol_order: &mut Vec<String>) -> Option<Element> {
    if !node.is_element() {
        return None;
    }
    let kind = match node.tag_name().name() {
        "g" => ElementKind::Group,
        "symbol" => {
            let view_box = node.attribute("viewBox").and_then(parse_view_box);
            ElementKind::Symbol { view_box }
        }
        "path" => match node.attribute("d").map(BezPath::from_svg) {
            Some(Ok(path)) => ElementKind::Path(path),
            Some(Err(err)) => {
                warn!("skipping path with unparsable 'd' attribute: {err}");
                return None;
            }
            None => {
                warn!("skipping path without 'd' attribute");
                return None;
            }
        },
        "rect" => {
            let x = float_attr(node, "x").unwrap_or(0.0);
            let y = float_attr(node, "y").unwrap_or(0.0);
            let w = float_attr(node, "width")?;
            let h = float_attr(node, "height")?;
            ElementKind::Path(Rect::new(x, y, x + w, y + h).to_path(0.1))
        }
        "circle" => {
            let cx = float_attr(node, "cx").unwrap_or(0.0);
            let cy = float_attr(node, "cy").unwrap_or(0.0);
            let r = float_attr(node, "r")?;
            ElementKind::Path(Circle::new(Point::new(cx, cy), r).to_path(0.1))
        }
        "defs" => ElementKind::Group,
        other => {
            warn!("unhandled element type {other:?}");
            return None;
        }
    };

    let id = node.attribute("id").map(str::to_owned);
    if let (ElementKind::Symbol { .. }, Some(id)) = (&kind, &id) {
        symbol_order.push(id.clone());
    }

    let classes = node
        .attribute("class")
        .map(|c| c.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default();
    let transform = node
        .attribute("transform")
        .map(parse_transform)
        .unwrap_or(Affine::IDENTITY);

    let is_leaf = matches!(kind, ElementKind::Path(_));
    let mut children = Vec::new();
    if !is_leaf {
        for child in node.children() {
            if let Some(elem) = parse_element(child, symbol_order) {
                children.push(elem);
            }
        }
    }

    Some(Element {
        id,
        classes,
        transform,
        fill: node.attribute("fill").map(parse_paint),
        stroke: node.attribute("stroke").map(parse_paint),
        stroke_width: float_attr(node, "stroke-width"),
        opacity: node
            .attribute("opacity")
            .map(parse_opacity)
            .unwrap_or(1.0),
        kind,
        children,
    })
}

fn float_attr(node: Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name).and_then(|s| s.trim().parse().ok())
}

fn parse_view_box(attr: &str) -> Option<Rect> {
    let vals: Vec<f64> = attr
        .split([' ', ','])
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if let &[x, y, w, h] = vals.as_slice() {
        Some(Rect::new(x, y, x + w, y + h))
    } else {
        None
    }
}

fn parse_paint(attr: &str) -> PaintAttr {
    let attr = attr.trim();
    if attr == "none" {
        PaintAttr::None
    } else {
        PaintAttr::Color(parse_color_str(attr))
    }
}

pub(crate) fn parse_color_str(s: &str) -> AlphaColor<Srgb> {
    parse_color(s.trim())
        .map(|c| c.to_alpha_color())
        .unwrap_or(palette::css::FUCHSIA.with_alpha(0.5))
}

fn parse_opacity(attr: &str) -> f32 {
    let value: f32 = if let Some(pct) = attr.strip_suffix('%') {
        pct.trim().parse().unwrap_or(100.0) * 0.01
    } else {
        attr.trim().parse().unwrap_or(1.0)
    };
    value.clamp(0.0, 1.0)
}

pub(crate) fn parse_transform(transform: &str) -> Affine {
    let mut nt = Affine::IDENTITY;
    for ts in transform.split(')').map(str::trim) {
        nt *= if let Some(s) = ts.strip_prefix("matrix(") {
            transform_args(s)
                .as_slice()
                .try_into()
                .map(Affine::new)
                .unwrap_or_else(|_| {
                    warn!("expected six arguments to 'matrix', got {ts:?}");
                    Affine::IDENTITY
                })
        } else if let Some(s) = ts.strip_prefix("translate(") {
            match *transform_args(s).as_slice() {
                [x] => Affine::translate(Vec2 { x, y: 0.0 }),
                [x, y] => Affine::translate(Vec2 { x, y }),
                _ => Affine::IDENTITY,
            }
        } else if let Some(s) = ts.strip_prefix("scale(") {
            match *transform_args(s).as_slice() {
                [x] => Affine::scale(x),
                [x, y] => Affine::scale_non_uniform(x, y),
                _ => Affine::IDENTITY,
            }
        } else {
            if !ts.is_empty() {
                warn!("did not understand transform attribute {ts:?}");
            }
            Affine::IDENTITY
        };
    }
    nt
}

fn transform_args(s: &str) -> Vec<f64> {
    s.split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"
        <svg width="100" height="100">
          <symbol id="icon1" viewBox="0 0 10 10">
            <path id="icon1-path" class="accent" d="M1 1 L9 1 L9 9 Z" fill="#336699"/>
          </symbol>
          <symbol id="icon2">
            <rect id="icon2-body" x="2" y="2" width="6" height="6" fill="red"/>
          </symbol>
          <g id="scene" class="layer base">
            <rect x="0" y="0" width="100" height="100" fill="white"/>
            <circle id="dot" cx="50" cy="50" r="10" fill="black"/>
          </g>
        </svg>"##;

    #[test]
    fn symbols_in_source_order() {
        let tree = SvgTree::parse(DOC).unwrap();
        let ids: Vec<_> = tree.symbol_ids().collect();
        assert_eq!(ids, ["icon1", "icon2"]);
        assert!(tree.has_symbol("icon1"));
        assert!(!tree.has_symbol("scene"));
    }

    #[test]
    fn sizing_from_width_height() {
        let tree = SvgTree::parse(DOC).unwrap();
        assert_eq!(tree.size(), Size::new(100.0, 100.0));
    }

    #[test]
    fn symbol_lookup_and_view_box() {
        let tree = SvgTree::parse(DOC).unwrap();
        let symbol = tree.symbol("icon1").unwrap();
        match symbol.kind {
            ElementKind::Symbol { view_box } => {
                assert_eq!(view_box, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
            }
            _ => panic!("expected a symbol"),
        }
        assert!(tree.symbol("dot").is_none(), "dot is not a symbol");
    }

    #[test]
    fn classes_are_split() {
        let tree = SvgTree::parse(DOC).unwrap();
        let scene = tree.find("scene").unwrap();
        assert_eq!(scene.classes.as_slice(), ["layer", "base"]);
    }

    #[test]
    fn malformed_markup_is_an_error() {
        assert!(SvgTree::parse("<svg><g></svg>").is_err());
    }
}
