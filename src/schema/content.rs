// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document extraction from application objects.
//!
//! ```text
//! Indexable::generate_document(index, observer)
//!     │
//!     └─→ ContentManager::extract
//!              ├─→ scalar field  → copy evaluated value
//!              └─→ struct field  → nested.generate_document (same observer)
//! ```
//!
//! The [`ObjectObserver`] travels down the whole extraction so that a
//! reference cycle between nested objects fails instead of recursing forever.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use super::field::{Field, FieldKind, Slot};
use crate::document::{Document, FieldValue};
use crate::error::{Result, SearchError};

/// An application object that can be turned into a search document.
///
/// Implemented by the surrounding application's model types. Nested
/// objects returned through [`Slot::Object`] must implement it as well to
/// contribute a nested document.
pub trait Indexable: Send + Sync {
    /// Stable identity used for cycle detection (e.g. `"Article#42"`).
    fn identity(&self) -> String;

    /// Type name under which the object's content is registered.
    fn type_name(&self) -> &str;

    /// Read a named property.
    fn read(&self, property: &str) -> Slot;

    /// Produce the document for `index`, or `None` when the object should
    /// not be indexed there.
    fn generate_document(
        &self,
        index: &str,
        observer: &mut ObjectObserver,
    ) -> Result<Option<Document>>;
}

/// Identities visited during one document-generation pass.
#[derive(Debug, Default)]
pub struct ObjectObserver {
    visited: HashSet<String>,
}

impl ObjectObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit; fails if the object was already visited in this pass.
    pub fn add(&mut self, object: &dyn Indexable) -> Result<()> {
        let identity = object.identity();
        if self.visited.contains(&identity) {
            return Err(SearchError::CircularReference { identity });
        }
        self.visited.insert(identity);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, object: &dyn Indexable) -> bool {
        self.visited.contains(&object.identity())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

/// Ordered field definitions for one (type, index) pair.
#[derive(Debug, Clone)]
pub struct ContentManager {
    type_name: String,
    index: String,
    fields: IndexMap<String, Field>,
}

impl ContentManager {
    #[must_use]
    pub fn new(type_name: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            index: index.into(),
            fields: IndexMap::new(),
        }
    }

    /// Add a field. Re-adding a name replaces the earlier definition in place.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Result<Self> {
        field.check()?;
        self.fields.insert(name.into(), field);
        Ok(self)
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter()
    }

    /// Walk the fields against `object` and build its document.
    ///
    /// Absent or null struct values become `null`; struct values that are
    /// not indexable objects are left out.
    pub fn extract(
        &self,
        object: &dyn Indexable,
        index: &str,
        observer: &mut ObjectObserver,
    ) -> Result<Document> {
        observer.add(object)?;

        let mut document = Document::new();
        for (name, field) in &self.fields {
            let slot = field.evaluate(object);
            if field.kind() == FieldKind::Struct {
                match slot {
                    Slot::Absent | Slot::Value(FieldValue::Null) => {
                        document.insert(name.clone(), FieldValue::Null);
                    }
                    Slot::Object(nested) => {
                        let value = nested
                            .generate_document(index, observer)?
                            .map_or(FieldValue::Null, FieldValue::Nested);
                        document.insert(name.clone(), value);
                    }
                    Slot::Value(other) => {
                        debug!(field = %name, kind = other.kind_name(), "Struct value is not indexable, skipping");
                    }
                }
            } else {
                match slot {
                    Slot::Absent => document.insert(name.clone(), FieldValue::Null),
                    Slot::Value(value) => document.insert(name.clone(), value),
                    Slot::Object(nested) => {
                        debug!(field = %name, object = %nested.identity(), "Object in scalar field, skipping");
                    }
                }
            }
        }
        Ok(document)
    }
}
