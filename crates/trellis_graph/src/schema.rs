// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property schemas.
//!
//! Values live in each node's model; the schema (type plus bounds or items)
//! lives here, shared by every node of the same type once the node is in a
//! graph.

use crate::property::{PropertyKind, PropertyType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Property name to schema entry, for one node type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    entries: IndexMap<String, PropertyKind>,
}

impl PropertySchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema of the built-in node properties
    pub fn builtin() -> Self {
        let mut schema = Self::new();
        for (name, property_type) in [
            ("icon", PropertyType::Hidden),
            ("name", PropertyType::Text),
            ("color", PropertyType::Color),
            ("border_color", PropertyType::Hidden),
            ("text_color", PropertyType::Hidden),
            ("disabled", PropertyType::Checkbox),
            ("selected", PropertyType::Hidden),
            ("width", PropertyType::Hidden),
            ("height", PropertyType::Hidden),
            ("pos", PropertyType::Hidden),
        ] {
            schema.insert(name, PropertyKind::new(property_type));
        }
        schema
    }

    /// Get the entry for a property
    pub fn get(&self, name: &str) -> Option<&PropertyKind> {
        self.entries.get(name)
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, kind: PropertyKind) {
        self.entries.insert(name.into(), kind);
    }

    /// Whether an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Property names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the schema has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the entries matching the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|name, _| keep(name));
    }

    /// Copy every entry of `other` into this schema, replacing existing ones
    pub fn merge(&mut self, other: PropertySchema) {
        self.entries.extend(other.entries);
    }
}

/// Graph-wide registry of property schemas, keyed by node type
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: IndexMap<String, PropertySchema>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a node's schema into the entry for its type
    pub fn register(&mut self, node_type: &str, schema: PropertySchema) {
        self.types
            .entry(node_type.to_string())
            .or_default()
            .merge(schema);
    }

    /// Add or replace one property of a type
    pub fn insert_property(&mut self, node_type: &str, name: &str, kind: PropertyKind) {
        self.types
            .entry(node_type.to_string())
            .or_insert_with(PropertySchema::builtin)
            .insert(name, kind);
    }

    /// Schema for a node type
    pub fn get(&self, node_type: &str) -> Option<&PropertySchema> {
        self.types.get(node_type)
    }

    /// Schema entry for one property of a node type
    pub fn property(&self, node_type: &str, name: &str) -> Option<&PropertyKind> {
        self.get(node_type)?.get(name)
    }

    /// Registered node types
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
