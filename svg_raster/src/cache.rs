// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fingerprint-keyed raster cache.
//!
//! Invalidation is logical: fingerprints embed the document's content
//! revision and the override revision, so any mutation makes previously
//! cached keys unreachable without a sweep. Explicit removal exists for
//! reclaiming the memory of unreachable entries.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};

use crate::pixmap::Pixmap;

/// The rendering target of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// The whole document.
    Full,
    /// One named symbol subtree.
    Symbol(String),
}

/// Fingerprint of one renderable unit.
///
/// Two requests may share a cached raster exactly when their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Content revision of the document the raster was computed from.
    pub content_revision: u64,
    /// Full document or one symbol.
    pub scope: ScopeKey,
    /// Effective raster width in pixels (after LOD).
    pub width: u32,
    /// Effective raster height in pixels (after LOD).
    pub height: u32,
    /// Override revision in force at computation time.
    pub override_revision: u64,
    /// Identity of the shader pass applied, if any.
    pub shader: Option<u64>,
}

#[derive(Debug)]
struct CacheEntry {
    image: Arc<Pixmap>,
    bytes: usize,
    last_access: u64,
}

/// Cache of rasterized images, keyed by [`CacheKey`].
#[derive(Debug)]
pub struct RasterCache {
    map: HashMap<CacheKey, CacheEntry>,
    enabled: bool,
    bytes: usize,
    serial: u64,
    max_bytes: Option<usize>,
    hits: u64,
    misses: u64,
}

impl Default for RasterCache {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            enabled: true,
            bytes: 0,
            serial: 0,
            max_bytes: None,
            hits: 0,
            misses: 0,
        }
    }
}

impl RasterCache {
    /// Create an enabled cache with no byte budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the raster for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs at most once per distinct key; a second request for
    /// the same key returns the stored image without invoking it. While the
    /// cache is disabled, `compute` always runs and nothing is stored, but
    /// existing entries are kept for a later re-enable.
    pub fn get_or_compute<E>(
        &mut self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<Pixmap, E>,
    ) -> Result<Arc<Pixmap>, E> {
        self.serial += 1;
        if self.enabled {
            if let Some(entry) = self.map.get_mut(&key) {
                entry.last_access = self.serial;
                self.hits += 1;
                trace!("cache hit: {key:?}");
                return Ok(entry.image.clone());
            }
        }
        let image = Arc::new(compute()?);
        if self.enabled {
            self.misses += 1;
            trace!("cache miss: {key:?}");
            let bytes = image.size_in_bytes();
            self.bytes += bytes;
            self.map.insert(
                key,
                CacheEntry {
                    image: image.clone(),
                    bytes,
                    last_access: self.serial,
                },
            );
            self.prune_to_budget();
        }
        Ok(image)
    }

    /// Remove every entry whose key matches the predicate.
    pub fn invalidate_matching(&mut self, predicate: impl Fn(&CacheKey) -> bool) {
        let before = self.map.len();
        let bytes = &mut self.bytes;
        self.map.retain(|key, entry| {
            if predicate(key) {
                *bytes -= entry.bytes;
                false
            } else {
                true
            }
        });
        let removed = before - self.map.len();
        if removed > 0 {
            debug!("invalidated {removed} cache entries");
        }
    }

    /// Remove every entry unconditionally.
    pub fn clear(&mut self) {
        self.map.clear();
        self.bytes = 0;
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Current occupancy in bytes of pixel data.
    pub fn size_bytes(&self) -> usize {
        self.bytes
    }

    /// Enable or disable the cache.
    ///
    /// Disabling does not drop existing entries; call [`clear`](Self::clear)
    /// to reclaim them.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set a byte budget; least-recently-used entries are evicted when a
    /// store would exceed it. `None` removes the bound.
    pub fn set_max_bytes(&mut self, max_bytes: Option<usize>) {
        self.max_bytes = max_bytes;
        self.prune_to_budget();
    }

    /// Number of lookups answered from the cache.
    pub fn hit_count(&self) -> u64 {
        self.hits
    }

    /// Number of lookups that ran the compute closure and stored.
    pub fn miss_count(&self) -> u64 {
        self.misses
    }

    fn prune_to_budget(&mut self) {
        let Some(max_bytes) = self.max_bytes else {
            return;
        };
        while self.bytes > max_bytes && !self.map.is_empty() {
            let oldest = self
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());
            let Some(key) = oldest else { break };
            if let Some(entry) = self.map.remove(&key) {
                self.bytes -= entry.bytes;
                debug!("evicted {key:?} ({} bytes) for budget", entry.bytes);
            }
        }
    }
}
