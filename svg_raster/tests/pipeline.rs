// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end pipeline behavior through the public API: caching, override
//! invalidation, LOD sizing, and the shader pass.

use std::sync::Arc;

use svg_raster::peniko::color::palette::css::{BLUE, LIME};
use svg_raster::{OverrideError, RenderError, Shader, SvgRaster};

const DOC: &str = r##"
    <svg width="8" height="8">
      <symbol id="icon1" viewBox="0 0 8 8">
        <rect id="icon1-bg" class="bg" width="8" height="8" fill="#ff0000"/>
      </symbol>
      <symbol id="icon2" viewBox="0 0 8 8">
        <rect id="icon2-bg" class="bg" width="8" height="8" fill="#ff0000"/>
      </symbol>
      <rect id="body" width="8" height="8" fill="#0000ff"/>
    </svg>"##;

fn loaded() -> SvgRaster {
    let mut svg = SvgRaster::new();
    svg.load_from_str(DOC).unwrap();
    svg
}

fn center(pixmap: &svg_raster::Pixmap) -> svg_raster::peniko::color::Rgba8 {
    pixmap.sample(pixmap.width() / 2, pixmap.height() / 2)
}

#[test]
fn repeated_requests_share_the_cached_raster() {
    let mut svg = loaded();
    let first = svg.rasterize_full((16, 16)).unwrap();
    let second = svg.rasterize_full((16, 16)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(svg.cache().hit_count(), 1);
    assert_eq!(svg.cache().miss_count(), 1);
    assert_eq!(svg.cache_len(), 1);
}

#[test]
fn symbols_render_independently_of_the_document_body() {
    let mut svg = loaded();
    let full = svg.rasterize_full((8, 8)).unwrap();
    let icon = svg.rasterize_symbol("icon1", (8, 8)).unwrap();
    // The body is blue; symbol definitions do not bleed into it.
    assert_eq!(center(&full).b, 255);
    assert_eq!(center(&icon).r, 255);
    assert_eq!(svg.cache_len(), 2);
}

#[test]
fn fill_override_changes_the_target_and_only_the_target() {
    let mut svg = loaded();
    let icon2_before = svg.rasterize_symbol("icon2", (8, 8)).unwrap();

    svg.override_fill("icon1-bg", LIME).unwrap();
    let icon1 = svg.rasterize_symbol("icon1", (8, 8)).unwrap();
    let icon2 = svg.rasterize_symbol("icon2", (8, 8)).unwrap();

    assert_eq!(center(&icon1).g, 255);
    assert_eq!(center(&icon1).r, 0);
    // icon2 is recomputed under the new override revision but its pixels
    // are untouched.
    assert!(!Arc::ptr_eq(&icon2_before, &icon2));
    assert_eq!(icon2.data_as_u8_slice(), icon2_before.data_as_u8_slice());
}

#[test]
fn id_override_beats_class_override() {
    let mut svg = loaded();
    svg.override_fill_by_class("bg", BLUE).unwrap();
    svg.override_fill("icon1-bg", LIME).unwrap();

    let icon1 = svg.rasterize_symbol("icon1", (8, 8)).unwrap();
    let icon2 = svg.rasterize_symbol("icon2", (8, 8)).unwrap();
    assert_eq!(center(&icon1).g, 255, "id wins on icon1");
    assert_eq!(center(&icon2).b, 255, "class applies where no id matches");
}

#[test]
fn clearing_an_override_restores_document_styling() {
    let mut svg = loaded();
    svg.override_fill("icon1-bg", LIME).unwrap();
    let overridden = svg.rasterize_symbol("icon1", (8, 8)).unwrap();
    assert_eq!(center(&overridden).g, 255);

    svg.clear_fill_override("icon1-bg");
    let restored = svg.rasterize_symbol("icon1", (8, 8)).unwrap();
    assert_eq!(center(&restored).r, 255);
}

#[test]
fn override_on_an_absent_id_does_not_change_pixels() {
    let mut svg = loaded();
    let before = svg.rasterize_full((8, 8)).unwrap();
    svg.override_fill("missing-id", LIME).unwrap();
    let after = svg.rasterize_full((8, 8)).unwrap();
    // New revision, new cache entry, identical raster.
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.data_as_u8_slice(), before.data_as_u8_slice());
}

#[test]
fn css_property_strings_reach_rendering() {
    let mut svg = loaded();
    svg.override_css_property("body", "fill", "lime").unwrap();
    let full = svg.rasterize_full((8, 8)).unwrap();
    assert_eq!(center(&full).g, 255);
}

#[test]
fn malformed_css_values_are_rejected_without_a_revision_bump() {
    let mut svg = loaded();
    let before = svg.overrides().revision();
    let err = svg.override_css_property("body", "opacity", "very");
    assert!(matches!(err, Err(OverrideError::InvalidValue { .. })));
    assert_eq!(svg.overrides().revision(), before);
}

#[test]
fn reloading_drops_rasters_of_the_old_content() {
    let mut svg = loaded();
    let _ = svg.rasterize_full((8, 8)).unwrap();
    let _ = svg.rasterize_symbol("icon1", (8, 8)).unwrap();
    assert_eq!(svg.cache_len(), 2);

    svg.load_from_str(DOC).unwrap();
    assert_eq!(svg.cache_len(), 0, "old-revision entries are reclaimed");
}

#[test]
fn disabling_the_cache_bypasses_without_purging() {
    let mut svg = loaded();
    let stored = svg.rasterize_full((8, 8)).unwrap();
    assert_eq!(svg.cache_len(), 1);

    svg.set_cache_enabled(false);
    let fresh = svg.rasterize_full((8, 8)).unwrap();
    assert!(!Arc::ptr_eq(&stored, &fresh), "disabled cache recomputes");
    assert_eq!(svg.cache_len(), 1, "entries survive while disabled");

    svg.set_cache_enabled(true);
    let hit = svg.rasterize_full((8, 8)).unwrap();
    assert!(Arc::ptr_eq(&stored, &hit));
}

#[test]
fn clear_cache_reclaims_everything() {
    let mut svg = loaded();
    let _ = svg.rasterize_full((8, 8)).unwrap();
    assert!(svg.cache_size_bytes() > 0);
    svg.clear_cache();
    assert_eq!(svg.cache_len(), 0);
    assert_eq!(svg.cache_size_bytes(), 0);
}

#[test]
fn lod_bias_shrinks_the_produced_raster() {
    let mut svg = loaded();
    svg.set_lod_enabled(true);
    svg.set_lod_bias(0.5);
    let raster = svg.rasterize_full((16, 16)).unwrap();
    assert_eq!((raster.width(), raster.height()), (8, 8));
    assert_eq!(svg.calculate_lod_size((16, 16)), (8, 8));
}

#[test]
fn lod_sizes_are_monotone_in_the_request() {
    let mut svg = loaded();
    svg.set_lod_enabled(true);
    svg.set_lod_bias(0.3);
    let mut last = 0;
    for w in 1..128 {
        let (ew, _) = svg.calculate_lod_size((w, w));
        assert!(ew >= last);
        last = ew;
    }
}

#[test]
fn lod_states_cache_separately() {
    let mut svg = loaded();
    let _ = svg.rasterize_full((16, 16)).unwrap();
    svg.set_lod_enabled(true);
    svg.set_lod_bias(0.5);
    let _ = svg.rasterize_full((16, 16)).unwrap();
    assert_eq!(svg.cache_len(), 2, "8x8 and 16x16 rasters coexist");
}

#[test]
fn grayscale_shader_desaturates() {
    let mut svg = loaded();
    let shader = Shader::new("grayscale");
    let raster = svg
        .rasterize_element_with_shader("icon1-bg", (8, 8), &shader)
        .unwrap();
    let p = center(&raster);
    assert_eq!(p.r, p.g);
    assert_eq!(p.g, p.b);
    assert!(p.r < 100, "red carries little luma, got {}", p.r);
}

#[test]
fn invalid_shader_falls_back_to_the_unshaded_raster() {
    let mut svg = loaded();
    let baseline = svg.rasterize_symbol("icon1", (8, 8)).unwrap();
    let raster = svg
        .rasterize_element_with_shader("icon1-bg", (8, 8), &Shader::new("sparkle"))
        .unwrap();
    assert_eq!(raster.data_as_u8_slice(), baseline.data_as_u8_slice());
}

#[test]
fn stored_shader_override_applies_to_symbol_renders() {
    let mut svg = loaded();
    svg.override_shader("icon1", Shader::new("invert")).unwrap();
    let icon1 = svg.rasterize_symbol("icon1", (8, 8)).unwrap();
    let icon2 = svg.rasterize_symbol("icon2", (8, 8)).unwrap();
    // Red inverts to cyan; the unshaded sibling stays red.
    assert_eq!((center(&icon1).r, center(&icon1).g), (0, 255));
    assert_eq!(center(&icon2).r, 255);
}

#[test]
fn render_errors_are_specific() {
    let mut svg = SvgRaster::new();
    assert!(matches!(
        svg.rasterize_full((8, 8)),
        Err(RenderError::NotLoaded)
    ));

    svg.load_from_str(DOC).unwrap();
    assert!(matches!(
        svg.rasterize_full((0, 8)),
        Err(RenderError::InvalidSize(0, 8))
    ));
    assert!(matches!(
        svg.rasterize_symbol("nope", (8, 8)),
        Err(RenderError::UnknownSymbol(id)) if id == "nope"
    ));
    assert!(matches!(
        svg.rasterize_element_with_shader("nope", (8, 8), &Shader::new("invert")),
        Err(RenderError::UnknownElement(id)) if id == "nope"
    ));
}

#[test]
fn unload_keeps_controls_but_stops_rendering() {
    let mut svg = loaded();
    svg.override_fill("icon1-bg", LIME).unwrap();
    svg.unload();
    assert!(matches!(
        svg.rasterize_full((8, 8)),
        Err(RenderError::NotLoaded)
    ));
    assert_eq!(svg.overrides().len(), 1, "overrides outlive the document");
}

#[test]
fn symbol_introspection_matches_the_document() {
    let mut svg = loaded();
    svg.load_from_str(DOC).unwrap();
    assert_eq!(svg.symbol_ids(), vec!["icon1", "icon2"]);
    assert!(svg.has_symbol("icon2"));
    let info = svg.symbol_info("icon1").unwrap();
    assert_eq!(info.id, "icon1");
    assert!(info.view_box.is_some());
}
