// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ownership wrapper around a parsed SVG tree.
//!
//! The handle pairs the tree with a monotonically increasing *content
//! revision*. The revision participates in every cache fingerprint, so
//! reloading a document logically invalidates all rasters computed from the
//! previous content without any explicit cache sweep.

use std::fs;
use std::path::Path;

use log::debug;
use peniko::kurbo::Rect;

use crate::tree::{ElementKind, SvgTree};
use crate::LoadError;

/// A loaded SVG document with its content revision.
#[derive(Debug, Default)]
pub struct SvgDocument {
    tree: Option<SvgTree>,
    revision: u64,
}

/// Introspection record for one `<symbol>` definition.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    /// The symbol's id attribute.
    pub id: String,
    /// The symbol's `viewBox`, if it declares one.
    pub view_box: Option<Rect>,
    /// Union of the symbol content's shape bounds, in symbol coordinates.
    pub bounds: Option<Rect>,
}

impl SvgDocument {
    /// Create an empty handle with nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from a string, replacing any previous content.
    ///
    /// Returns the new content revision. The revision grows on *every*
    /// successful load, even when the source is byte-identical to the
    /// previous one; re-parsing is not assumed cheap enough to compare.
    pub fn load_str(&mut self, source: &str) -> Result<u64, LoadError> {
        if source.trim().is_empty() {
            return Err(LoadError::Empty);
        }
        let tree = SvgTree::parse(source)?;
        self.revision += 1;
        debug!(
            "loaded document revision {} with {} symbols",
            self.revision,
            tree.symbol_ids().count()
        );
        self.tree = Some(tree);
        Ok(self.revision)
    }

    /// Load a document from a file, replacing any previous content.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<u64, LoadError> {
        let source = fs::read_to_string(path)?;
        self.load_str(&source)
    }

    /// Drop the loaded tree.
    ///
    /// The revision counter is retained, so a later reload still produces a
    /// strictly greater revision than any raster cached so far.
    pub fn unload(&mut self) {
        self.tree = None;
    }

    /// Whether a document is currently loaded.
    pub fn is_loaded(&self) -> bool {
        self.tree.is_some()
    }

    /// The current content revision. Zero means nothing was ever loaded.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The parsed tree, if loaded.
    pub fn tree(&self) -> Option<&SvgTree> {
        self.tree.as_ref()
    }

    /// Ids of all symbol definitions, in source order.
    pub fn symbol_ids(&self) -> Vec<&str> {
        self.tree
            .as_ref()
            .map(|t| t.symbol_ids().collect())
            .unwrap_or_default()
    }

    /// Whether the loaded document defines a symbol with this id.
    pub fn has_symbol(&self, id: &str) -> bool {
        self.tree.as_ref().is_some_and(|t| t.has_symbol(id))
    }

    /// Metadata for one symbol. Unknown ids yield `None`, never an error.
    pub fn symbol_info(&self, id: &str) -> Option<SymbolInfo> {
        let tree = self.tree.as_ref()?;
        let symbol = tree.symbol(id)?;
        let view_box = match symbol.kind {
            ElementKind::Symbol { view_box } => view_box,
            _ => None,
        };
        Some(SymbolInfo {
            id: id.to_owned(),
            view_box,
            bounds: symbol.bounds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"
        <svg width="20" height="20">
          <symbol id="a" viewBox="0 0 4 4"><path d="M0 0 L4 4" stroke="black"/></symbol>
          <symbol id="b"><rect width="2" height="2" fill="red"/></symbol>
        </svg>"##;

    #[test]
    fn revision_grows_on_every_load() {
        let mut doc = SvgDocument::new();
        assert_eq!(doc.revision(), 0);
        let first = doc.load_str(DOC).unwrap();
        let second = doc.load_str(DOC).unwrap();
        assert!(second > first, "identical content still bumps the revision");
    }

    #[test]
    fn unload_keeps_the_counter() {
        let mut doc = SvgDocument::new();
        let first = doc.load_str(DOC).unwrap();
        doc.unload();
        assert!(!doc.is_loaded());
        assert_eq!(doc.revision(), first);
        let again = doc.load_str(DOC).unwrap();
        assert!(again > first);
    }

    #[test]
    fn empty_source_is_rejected() {
        let mut doc = SvgDocument::new();
        assert!(matches!(doc.load_str("   "), Err(LoadError::Empty)));
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut doc = SvgDocument::new();
        assert!(matches!(
            doc.load_file("/definitely/not/here.svg"),
            Err(LoadError::Io(_))
        ));
    }

    #[test]
    fn symbol_info_for_unknown_id_is_none() {
        let mut doc = SvgDocument::new();
        doc.load_str(DOC).unwrap();
        assert!(doc.symbol_info("nope").is_none());
        let info = doc.symbol_info("a").unwrap();
        assert_eq!(info.view_box, Some(Rect::new(0.0, 0.0, 4.0, 4.0)));
    }
}
