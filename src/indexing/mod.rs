// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document indexing pipeline.
//!
//! ```text
//! Indexable::generate_document
//!     ↓ (empty documents dropped)
//! Indexer::prepare     - requires an "id"
//!     ↓
//! Indexer::transform   - flatten, drop blanks, stringify booleans, wrap in envelope
//!     ↓
//! Indexer::publish_all - split by payload size, retry throttling
//! ```
//!
//! Backends implement the four required methods; `put`, `put_all`,
//! `delete` and `delete_all` are provided on top of them.

mod batch;

pub use batch::{encoded_size, partition, split_payload};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{flatten, Document, FieldValue};
use crate::error::{Result, SearchError};
use crate::metrics;
use crate::schema::{Indexable, ObjectObserver};

/// Field every published document must carry.
pub const ID_FIELD: &str = "id";

/// What a publish does to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Publish,
    Delete,
}

impl Operation {
    /// Metrics `operation` label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Publish => "publish",
            Operation::Delete => "delete",
        }
    }
}

/// A document left out of a batch.
#[derive(Debug)]
pub struct Rejection {
    /// Identity of the source object
    pub identity: String,
    pub error: SearchError,
}

/// Outcome of a batch put or delete.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Documents handed to the backend
    pub published: usize,
    /// Objects that produced no document
    pub skipped: usize,
    pub rejected: Vec<Rejection>,
}

impl PublishReport {
    /// True when nothing was rejected
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Backend-specific publishing of documents.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Index documents are generated for.
    fn index_name(&self) -> &str;

    /// Backend label for metrics.
    fn backend_name(&self) -> &'static str;

    /// Wrap a prepared document in the backend's add envelope.
    fn transform(&self, document: Document) -> Result<Value>;

    /// Envelope removing the document with `id`.
    fn delete_envelope(&self, id: &str) -> Value;

    /// Send envelopes to the backend.
    async fn publish_all(&self, operation: Operation, payloads: Vec<Value>) -> Result<()>;

    /// Check a generated document before it is transformed.
    fn prepare(&self, document: Document) -> Result<Document> {
        document_id(&document)?;
        Ok(document)
    }

    async fn publish(&self, operation: Operation, payload: Value) -> Result<()> {
        self.publish_all(operation, vec![payload]).await
    }

    /// Index one object. Fails on the first problem.
    async fn put(&self, object: &dyn Indexable) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        match self.generate(object)? {
            Some(document) => {
                let payload = self.transform(self.prepare(document)?)?;
                self.publish(Operation::Publish, payload).await?;
                report.published = 1;
            }
            None => report.skipped = 1,
        }
        Ok(report)
    }

    /// Index many objects in one publish. Objects whose document cannot be
    /// generated or prepared are reported instead of failing the batch.
    async fn put_all(&self, objects: &[&dyn Indexable]) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        let mut payloads = Vec::with_capacity(objects.len());

        for object in objects {
            let payload = match self.generate(*object) {
                Ok(Some(document)) => self.prepare(document).and_then(|document| self.transform(document)),
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(err) => Err(err),
            };
            match payload {
                Ok(payload) => payloads.push(payload),
                Err(err) => {
                    warn!(index = self.index_name(), identity = %object.identity(), error = %err, "Document rejected");
                    report.rejected.push(Rejection {
                        identity: object.identity(),
                        error: err,
                    });
                }
            }
        }

        if !report.rejected.is_empty() {
            metrics::record_documents_rejected(self.backend_name(), report.rejected.len());
        }
        if !payloads.is_empty() {
            report.published = payloads.len();
            self.publish_all(Operation::Publish, payloads).await?;
        }
        debug!(
            index = self.index_name(),
            published = report.published,
            skipped = report.skipped,
            rejected = report.rejected.len(),
            "Batch put finished"
        );
        Ok(report)
    }

    /// Remove one object's document.
    async fn delete(&self, object: &dyn Indexable) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        match self.generate(object)? {
            Some(document) => {
                let id = document_id(&self.prepare(document)?)?;
                self.publish(Operation::Delete, self.delete_envelope(&id)).await?;
                report.published = 1;
            }
            None => report.skipped = 1,
        }
        Ok(report)
    }

    /// Remove many objects' documents in one publish.
    async fn delete_all(&self, objects: &[&dyn Indexable]) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        let mut payloads = Vec::with_capacity(objects.len());

        for object in objects {
            let id = match self.generate(*object) {
                Ok(Some(document)) => self.prepare(document).and_then(|document| document_id(&document)),
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(err) => Err(err),
            };
            match id {
                Ok(id) => payloads.push(self.delete_envelope(&id)),
                Err(err) => report.rejected.push(Rejection {
                    identity: object.identity(),
                    error: err,
                }),
            }
        }

        if !report.rejected.is_empty() {
            metrics::record_documents_rejected(self.backend_name(), report.rejected.len());
        }
        if !payloads.is_empty() {
            report.published = payloads.len();
            self.publish_all(Operation::Delete, payloads).await?;
        }
        Ok(report)
    }

    /// Generate with a fresh observer; empty documents count as none.
    fn generate(&self, object: &dyn Indexable) -> Result<Option<Document>> {
        let mut observer = ObjectObserver::new();
        let document = object.generate_document(self.index_name(), &mut observer)?;
        Ok(document.filter(|document| !document.is_empty()))
    }
}

/// Non-blank identifier of a document.
pub fn document_id(document: &Document) -> Result<String> {
    let id = match document.get(ID_FIELD) {
        Some(FieldValue::Text(text)) => text.trim().to_string(),
        Some(FieldValue::Integer(n)) => n.to_string(),
        _ => String::new(),
    };
    if id.is_empty() {
        return Err(SearchError::Indexing(format!(
            "Document is missing a non-blank '{ID_FIELD}' field"
        )));
    }
    Ok(id)
}

/// Fields of a document as published: flattened with the nesting
/// delimiter, blank values dropped (`false` is kept), booleans as strings,
/// dates as UTC RFC 3339.
#[must_use]
pub fn transform_fields(document: &Document) -> Map<String, Value> {
    flatten(&document.to_json())
        .into_iter()
        .filter(|(_, value)| !is_blank(value))
        .map(|(name, value)| (name, stringify_booleans(value)))
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn stringify_booleans(value: Value) -> Value {
    match value {
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(stringify_booleans).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(name, value)| (name, stringify_booleans(value)))
                .collect(),
        ),
        other => other,
    }
}
