// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style override storage.
//!
//! Overrides are keyed by selector (element id or class name) and property.
//! The store owns an *override revision*, bumped on every mutation; the
//! revision is folded into every cache fingerprint computed afterwards, so
//! rasters produced under stale overrides become unreachable without an
//! explicit cache sweep.

use std::collections::HashMap;

use peniko::color::{AlphaColor, Srgb};
use peniko::kurbo::Affine;

use crate::shader::Shader;
use crate::OverrideError;

/// What an override targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// A single element, by its `id` attribute.
    Id(String),
    /// All elements carrying this class.
    Class(String),
}

impl Selector {
    /// Selector for the element with the given id.
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Selector for all elements with the given class.
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }
}

/// The closed set of properties the rasterizer understands.
///
/// Any other property name is accepted and stored as [`Property::Custom`]
/// for forward compatibility; it has no rendering effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Property {
    FillColor,
    StrokeColor,
    Opacity,
    Transform,
    Shader,
    Custom(String),
}

impl Property {
    /// Map a CSS-style property name onto the closed set.
    pub fn parse(name: &str) -> Self {
        match name {
            "fill-color" | "fill" => Self::FillColor,
            "stroke-color" | "stroke" => Self::StrokeColor,
            "opacity" => Self::Opacity,
            "transform" => Self::Transform,
            "shader" => Self::Shader,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Whether a container override of this property flows down to
    /// descendant leaf shapes.
    pub fn is_inheritable(&self) -> bool {
        matches!(
            self,
            Self::FillColor | Self::StrokeColor | Self::Opacity | Self::Transform
        )
    }
}

/// An override value, tagged by kind.
///
/// The store rejects values whose kind does not match the property they are
/// set for, instead of holding duck-typed values.
#[derive(Debug, Clone)]
pub enum Value {
    Color(AlphaColor<Srgb>),
    Scalar(f32),
    Transform(Affine),
    Shader(Shader),
    Raw(String),
}

impl Value {
    fn fits(&self, property: &Property) -> bool {
        match property {
            Property::FillColor | Property::StrokeColor => matches!(self, Self::Color(_)),
            Property::Opacity => matches!(self, Self::Scalar(v) if (0.0..=1.0).contains(v)),
            Property::Transform => matches!(self, Self::Transform(_)),
            Property::Shader => matches!(self, Self::Shader(_)),
            Property::Custom(_) => matches!(self, Self::Raw(_)),
        }
    }
}

/// All active overrides for one document.
#[derive(Debug, Default)]
pub struct OverrideStore {
    records: HashMap<Selector, HashMap<Property, Value>>,
    revision: u64,
}

impl OverrideStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the override for `(selector, property)`.
    ///
    /// A value whose kind does not fit the property is rejected without any
    /// state change, leaving the revision untouched.
    pub fn set(
        &mut self,
        selector: Selector,
        property: Property,
        value: Value,
    ) -> Result<(), OverrideError> {
        if !value.fits(&property) {
            return Err(OverrideError::InvalidValue {
                property: format!("{property:?}"),
            });
        }
        self.records
            .entry(selector)
            .or_default()
            .insert(property, value);
        self.revision += 1;
        Ok(())
    }

    /// Remove the override for `(selector, property)`.
    ///
    /// The revision is bumped even when nothing matched; callers that care
    /// can check [`len`](Self::len) before and after.
    pub fn clear(&mut self, selector: &Selector, property: &Property) {
        if let Some(props) = self.records.get_mut(selector) {
            props.remove(property);
            if props.is_empty() {
                self.records.remove(selector);
            }
        }
        self.revision += 1;
    }

    /// Remove every override targeting `selector`.
    pub fn clear_all_for(&mut self, selector: &Selector) {
        self.records.remove(selector);
        self.revision += 1;
    }

    /// Remove every override.
    pub fn clear_all(&mut self) {
        self.records.clear();
        self.revision += 1;
    }

    /// The override revision. Part of every cache fingerprint.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of stored override records.
    pub fn len(&self) -> usize {
        self.records.values().map(HashMap::len).sum()
    }

    /// Whether the store holds no overrides.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The value stored for exactly `(selector, property)`, if any.
    pub fn lookup(&self, selector: &Selector, property: &Property) -> Option<&Value> {
        self.records.get(selector)?.get(property)
    }

    /// The effective value of `property` for an element with the given id
    /// and classes.
    ///
    /// Precedence is id-selector over class-selector, regardless of
    /// insertion order; classes are consulted in element order. Inheritance
    /// from ancestors is the resolver's concern, not the store's.
    pub fn resolve(
        &self,
        id: Option<&str>,
        classes: &[String],
        property: &Property,
    ) -> Option<&Value> {
        if let Some(id) = id {
            if let Some(value) = self
                .records
                .get(&Selector::Id(id.to_owned()))
                .and_then(|p| p.get(property))
            {
                return Some(value);
            }
        }
        classes.iter().find_map(|class| {
            self.records
                .get(&Selector::Class(class.clone()))
                .and_then(|p| p.get(property))
        })
    }
}
