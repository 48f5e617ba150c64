// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index registry
//!
//! Holds the index definitions and per-(type, index) content managers for a
//! process. Constructed once at startup and handed to whatever needs it;
//! there is no global registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::content::{ContentManager, Indexable, ObjectObserver};
use super::field::FieldKind;
use super::{Schema, SchemaEntry};
use crate::document::Document;
use crate::error::{Result, SearchError};

/// Search engine an index lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    CloudSearch,
    Elasticsearch,
}

impl Backend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::CloudSearch => "cloudsearch",
            Backend::Elasticsearch => "elasticsearch",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search index definition
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIndex {
    /// Index (domain) name
    pub name: String,
    pub backend: Backend,
    /// Schema used to resolve attribute paths
    pub schema: Schema,
}

impl SearchIndex {
    #[must_use]
    pub fn new(name: impl Into<String>, backend: Backend, schema: Schema) -> Self {
        Self {
            name: name.into(),
            backend,
            schema,
        }
    }
}

type ContentKey = (String, String);

/// Registry of index definitions and content managers.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: RwLock<HashMap<String, Arc<SearchIndex>>>,
    contents: RwLock<HashMap<ContentKey, Arc<ContentManager>>>,
}

impl IndexRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an index with an explicit schema.
    pub fn register(&self, index: SearchIndex) -> Arc<SearchIndex> {
        let index = Arc::new(index);
        self.indexes.write().insert(index.name.clone(), index.clone());
        info!(index = %index.name, backend = %index.backend, "Search index registered");
        index
    }

    /// Register the content a type contributes to an index.
    pub fn register_content(&self, content: ContentManager) -> Arc<ContentManager> {
        let key = (content.type_name().to_string(), content.index().to_string());
        let content = Arc::new(content);
        debug!(type_name = %key.0, index = %key.1, "Content registered");
        self.contents.write().insert(key, content.clone());
        content
    }

    /// Define an index whose schema is derived from every content manager
    /// registered for it.
    pub fn define_index(&self, name: &str, backend: Backend) -> Result<Arc<SearchIndex>> {
        let mut roots: Vec<Arc<ContentManager>> = self
            .contents
            .read()
            .iter()
            .filter(|((_, index), _)| index == name)
            .map(|(_, content)| content.clone())
            .collect();
        if roots.is_empty() {
            return Err(SearchError::UnknownIndex(name.to_string()));
        }
        roots.sort_by(|a, b| a.type_name().cmp(b.type_name()));

        let mut schema = Schema::new();
        for content in roots {
            schema.merge(self.schema_for(&content, name, &mut Vec::new()));
        }
        Ok(self.register(SearchIndex::new(name, backend, schema)))
    }

    /// Schema contributed by one content manager. Struct fields expand to
    /// the merged schemas of their source types; a source type already being
    /// expanded further up the path contributes nothing.
    fn schema_for(&self, content: &ContentManager, index: &str, path: &mut Vec<String>) -> Schema {
        path.push(content.type_name().to_string());
        let mut schema = Schema::new();
        for (name, field) in content.fields() {
            if field.kind() != FieldKind::Struct {
                schema.insert(name.clone(), SchemaEntry::Field(field.field_type().clone()));
                continue;
            }
            let mut nested = Schema::new();
            for source in field.from_types() {
                if path.contains(source) {
                    continue;
                }
                if let Some(source_content) = self.content(source, index) {
                    nested.merge(self.schema_for(&source_content, index, path));
                }
            }
            schema.insert(name.clone(), SchemaEntry::Nested(nested));
        }
        path.pop();
        schema
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<SearchIndex>> {
        self.indexes.read().get(name).cloned()
    }

    /// Index definition or [`SearchError::UnknownIndex`].
    pub fn index(&self, name: &str) -> Result<Arc<SearchIndex>> {
        self.get(name)
            .ok_or_else(|| SearchError::UnknownIndex(name.to_string()))
    }

    #[must_use]
    pub fn content(&self, type_name: &str, index: &str) -> Option<Arc<ContentManager>> {
        self.contents
            .read()
            .get(&(type_name.to_string(), index.to_string()))
            .cloned()
    }

    /// Extract `object` with the content registered for its type.
    ///
    /// Meant for [`Indexable::generate_document`] implementations.
    pub fn extract(
        &self,
        object: &dyn Indexable,
        index: &str,
        observer: &mut ObjectObserver,
    ) -> Result<Document> {
        let content = self.content(object.type_name(), index).ok_or_else(|| {
            SearchError::UnknownContent {
                type_name: object.type_name().to_string(),
                index: index.to_string(),
            }
        })?;
        content.extract(object, index, observer)
    }

    /// Top-level document generation with a fresh observer. Fails with
    /// [`SearchError::UnknownContent`] unless content is registered for the
    /// object's type on `index`.
    pub fn generate_document(&self, object: &dyn Indexable, index: &str) -> Result<Option<Document>> {
        if self.content(object.type_name(), index).is_none() {
            return Err(SearchError::UnknownContent {
                type_name: object.type_name().to_string(),
                index: index.to_string(),
            });
        }
        let mut observer = ObjectObserver::new();
        object.generate_document(index, &mut observer)
    }
}
