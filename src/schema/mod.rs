// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Schema model: content definitions and the index schemas derived from them.
//!
//! # Example
//!
//! ```rust
//! use search_bridge::schema::{ContentManager, Field, FieldType, Schema};
//!
//! let article = ContentManager::new("Article", "articles")
//!     .field("id", Field::property("id", FieldType::integer())).unwrap()
//!     .field("title", Field::property("title", FieldType::text().sortable(true))).unwrap()
//!     .field("author", Field::nested("author", ["Author"])).unwrap();
//!
//! // A schema can also be written out directly
//! let schema = Schema::new()
//!     .field("id", FieldType::integer())
//!     .nested("author", Schema::new().field("name", FieldType::string()));
//! assert!(schema.field_type("author.name").is_some());
//! ```

mod content;
mod field;
mod registry;

pub use content::{ContentManager, Indexable, ObjectObserver};
pub use field::{Accessor, Field, FieldKind, FieldType, Slot};
pub use registry::{Backend, IndexRegistry, SearchIndex};

use indexmap::IndexMap;

use crate::document::DELIMITER;

/// A schema slot: either a typed field or a nested schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaEntry {
    Field(FieldType),
    Nested(Schema),
}

/// Nested mapping from field name to type, used to resolve attribute paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    entries: IndexMap<String, SchemaEntry>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.entries.insert(name.into(), SchemaEntry::Field(field_type));
        self
    }

    #[must_use]
    pub fn nested(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.insert(name, SchemaEntry::Nested(schema));
        self
    }

    /// Insert an entry; nested schemas under the same name are merged.
    pub fn insert(&mut self, name: impl Into<String>, entry: SchemaEntry) {
        let name = name.into();
        match entry {
            SchemaEntry::Nested(incoming) => {
                if let Some(SchemaEntry::Nested(existing)) = self.entries.get_mut(&name) {
                    existing.merge(incoming);
                } else {
                    self.entries.insert(name, SchemaEntry::Nested(incoming));
                }
            }
            field => {
                self.entries.insert(name, field);
            }
        }
    }

    pub fn merge(&mut self, other: Schema) {
        for (name, entry) in other.entries {
            self.insert(name, entry);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a dot-separated path through nested schemas.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&SchemaEntry> {
        let mut parts = path.split('.');
        let mut entry = self.entries.get(parts.next()?)?;
        for part in parts {
            match entry {
                SchemaEntry::Nested(schema) => entry = schema.entries.get(part)?,
                SchemaEntry::Field(_) => return None,
            }
        }
        Some(entry)
    }

    /// Field type at `path`, if the path ends at a typed field.
    #[must_use]
    pub fn field_type(&self, path: &str) -> Option<&FieldType> {
        match self.resolve(path)? {
            SchemaEntry::Field(field_type) => Some(field_type),
            SchemaEntry::Nested(_) => None,
        }
    }

    /// Every typed field with its flattened (indexed) name.
    #[must_use]
    pub fn leaves(&self) -> Vec<(String, &FieldType)> {
        let mut leaves = Vec::new();
        self.collect_leaves(None, &mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, prefix: Option<&str>, out: &mut Vec<(String, &'a FieldType)>) {
        for (name, entry) in &self.entries {
            let full = match prefix {
                Some(prefix) => format!("{prefix}{DELIMITER}{name}"),
                None => name.clone(),
            };
            match entry {
                SchemaEntry::Field(field_type) => out.push((full, field_type)),
                SchemaEntry::Nested(schema) => schema.collect_leaves(Some(&full), out),
            }
        }
    }
}
