// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rasterization seam.
//!
//! Scan conversion is an external collaborator: the pipeline hands a
//! [`ResolvedScene`] and a pixel size to a [`Rasterizer`] and gets a
//! [`Pixmap`] back. Production hosts implement the trait over their
//! rendering library of choice.
//!
//! [`BoundsRasterizer`] is the built-in development backend. Like the
//! parser, it is intended for tests and bring-up, not fidelity: it fills
//! each shape's transformed bounding box instead of scan-converting the
//! outline, which is enough to observe style overrides, caching and LOD
//! behavior end to end.

use peniko::color::{AlphaColor, Rgba8, Srgb};
use peniko::kurbo::{Affine, Point, Rect, Shape};

use crate::pixmap::Pixmap;
use crate::resolve::ResolvedScene;
use crate::RenderError;

/// An external scan-conversion backend.
pub trait Rasterizer {
    /// Render a resolved scene into a raster of the given pixel size.
    ///
    /// The scene's viewport maps onto the full raster; implementations are
    /// synchronous and CPU-bound.
    fn rasterize(&self, scene: &ResolvedScene, size: (u32, u32)) -> Result<Pixmap, RenderError>;
}

/// Bounding-box development backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsRasterizer;

impl Rasterizer for BoundsRasterizer {
    fn rasterize(&self, scene: &ResolvedScene, size: (u32, u32)) -> Result<Pixmap, RenderError> {
        let mut pixmap = Pixmap::new(size.0, size.1);
        let viewport = scene.viewport;
        let sx = if viewport.width() > 0.0 {
            size.0 as f64 / viewport.width()
        } else {
            1.0
        };
        let sy = if viewport.height() > 0.0 {
            size.1 as f64 / viewport.height()
        } else {
            1.0
        };
        let to_device =
            Affine::scale_non_uniform(sx, sy) * Affine::translate(-viewport.origin().to_vec2());

        for shape in &scene.shapes {
            let device = to_device * shape.transform;
            let bbox = device.transform_rect_bbox(shape.path.bounding_box());
            if let Some(color) = shape.fill {
                blend_rect(&mut pixmap, bbox, None, color, shape.opacity);
            }
            if let Some((color, width)) = shape.stroke {
                // Stroke as a ring around the box, at device-scaled width.
                let hw = (width * 0.5 * sx.min(sy)).max(0.5);
                blend_rect(
                    &mut pixmap,
                    bbox.inflate(hw, hw),
                    Some(bbox.inflate(-hw, -hw)),
                    color,
                    shape.opacity,
                );
            }
        }
        Ok(pixmap)
    }
}

/// Fill `rect` (minus an optional `hole`) with `color` at `opacity`,
/// approximate source-over.
fn blend_rect(
    pixmap: &mut Pixmap,
    rect: Rect,
    hole: Option<Rect>,
    color: AlphaColor<Srgb>,
    opacity: f32,
) {
    let alpha = color.components[3] * opacity;
    let src = color.with_alpha(alpha).to_rgba8();
    if src.a == 0 {
        return;
    }
    let x0 = rect.x0.floor().max(0.0) as u32;
    let y0 = rect.y0.floor().max(0.0) as u32;
    let x1 = (rect.x1.ceil().min(pixmap.width() as f64)).max(0.0) as u32;
    let y1 = (rect.y1.ceil().min(pixmap.height() as f64)).max(0.0) as u32;
    for y in y0..y1 {
        for x in x0..x1 {
            if let Some(hole) = hole {
                let cx = x as f64 + 0.5;
                let cy = y as f64 + 0.5;
                if hole.contains(Point::new(cx, cy)) {
                    continue;
                }
            }
            let dst = pixmap.sample(x, y);
            pixmap.set_pixel(x, y, over(src, dst));
        }
    }
}

// Approximate source-over on straight-alpha u8 values. Not a compositing-
// grade operator, but deterministic and monotone, which is all the debug
// backend needs.
fn over(src: Rgba8, dst: Rgba8) -> Rgba8 {
    let sa = u16::from(src.a);
    let inv = 255 - sa;
    let mix = |s: u8, d: u8| ((u16::from(s) * sa + u16::from(d) * inv) / 255) as u8;
    Rgba8 {
        r: mix(src.r, dst.r),
        g: mix(src.g, dst.g),
        b: mix(src.b, dst.b),
        a: (sa + u16::from(dst.a) * inv / 255) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ResolvedShape;
    use peniko::color::palette::css::{BLUE, RED};
    use peniko::kurbo::BezPath;

    fn rect_path(rect: Rect) -> BezPath {
        rect.to_path(0.1)
    }

    fn scene(shapes: Vec<ResolvedShape>) -> ResolvedScene {
        ResolvedScene {
            shapes,
            viewport: Rect::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    #[test]
    fn empty_scene_is_transparent() {
        let pixmap = BoundsRasterizer
            .rasterize(&scene(Vec::new()), (4, 4))
            .unwrap();
        assert!(pixmap.data().iter().all(|p| p.a == 0));
    }

    #[test]
    fn fill_covers_the_mapped_box() {
        let shapes = vec![ResolvedShape {
            path: rect_path(Rect::new(0.0, 0.0, 5.0, 10.0)),
            transform: Affine::IDENTITY,
            fill: Some(RED),
            stroke: None,
            opacity: 1.0,
        }];
        let pixmap = BoundsRasterizer.rasterize(&scene(shapes), (10, 10)).unwrap();
        // Left half filled, right half untouched.
        assert_eq!(pixmap.sample(2, 5).r, 255);
        assert_eq!(pixmap.sample(2, 5).a, 255);
        assert_eq!(pixmap.sample(8, 5).a, 0);
    }

    #[test]
    fn later_shapes_paint_over_earlier_ones() {
        let full = Rect::new(0.0, 0.0, 10.0, 10.0);
        let shapes = vec![
            ResolvedShape {
                path: rect_path(full),
                transform: Affine::IDENTITY,
                fill: Some(RED),
                stroke: None,
                opacity: 1.0,
            },
            ResolvedShape {
                path: rect_path(full),
                transform: Affine::IDENTITY,
                fill: Some(BLUE),
                stroke: None,
                opacity: 1.0,
            },
        ];
        let pixmap = BoundsRasterizer.rasterize(&scene(shapes), (4, 4)).unwrap();
        let p = pixmap.sample(2, 2);
        assert_eq!((p.r, p.b), (0, 255));
    }

    #[test]
    fn stroke_paints_a_ring_not_the_interior() {
        let shapes = vec![ResolvedShape {
            path: rect_path(Rect::new(0.0, 0.0, 10.0, 10.0)),
            transform: Affine::IDENTITY,
            fill: None,
            stroke: Some((RED, 2.0)),
            opacity: 1.0,
        }];
        let pixmap = BoundsRasterizer.rasterize(&scene(shapes), (10, 10)).unwrap();
        assert_eq!(pixmap.sample(0, 0).a, 255, "edge is stroked");
        assert_eq!(pixmap.sample(5, 5).a, 0, "interior stays untouched");
    }

    #[test]
    fn opacity_attenuates_coverage() {
        let shapes = vec![ResolvedShape {
            path: rect_path(Rect::new(0.0, 0.0, 10.0, 10.0)),
            transform: Affine::IDENTITY,
            fill: Some(RED),
            stroke: None,
            opacity: 0.5,
        }];
        let pixmap = BoundsRasterizer.rasterize(&scene(shapes), (4, 4)).unwrap();
        let a = pixmap.sample(1, 1).a;
        assert!(a > 110 && a < 140, "half-opacity coverage, got {a}");
    }
}
