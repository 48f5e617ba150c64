// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! CloudSearch backend.
//!
//! Documents are uploaded as SDF batches:
//!
//! ```text
//! {"type": "add", "id": "42", "fields": {"title": "Dune", "author__name": "Frank"}}
//! {"type": "delete", "id": "42"}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{ensure_backend, Executor, SearchClient};
use crate::config::BridgeConfig;
use crate::document::Document;
use crate::error::Result;
use crate::indexing::{document_id, encoded_size, split_payload, transform_fields, Indexer, Operation};
use crate::metrics;
use crate::resilience::retry::{retry, RetryConfig};
use crate::schema::{Backend, FieldKind, FieldType, SearchIndex};
use crate::search::{CloudSearchRequest, CloudSearchResults, CloudSearchTranslator, Query, QueryParser, QueryVisitor};

const BACKEND: &str = "cloudsearch";

/// CloudSearch domain bound to one index definition.
pub struct CloudSearchBackend<C> {
    client: Arc<C>,
    index: Arc<SearchIndex>,
    parser: QueryParser,
    retry: RetryConfig,
    max_payload_bytes: usize,
    separator: String,
}

impl<C> CloudSearchBackend<C>
where
    C: SearchClient<Request = CloudSearchRequest>,
{
    /// Fails if `index` is not a CloudSearch index.
    pub fn new(client: Arc<C>, index: Arc<SearchIndex>, config: &BridgeConfig) -> Result<Self> {
        ensure_backend(&index, Backend::CloudSearch)?;
        Ok(Self {
            client,
            index,
            parser: QueryParser::Structured,
            retry: RetryConfig::from(config),
            max_payload_bytes: config.cloudsearch_max_payload_bytes,
            separator: config.multi_value_separator.clone(),
        })
    }

    /// Query language for the main query (filters stay structured)
    #[must_use]
    pub fn with_parser(mut self, parser: QueryParser) -> Self {
        self.parser = parser;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn parser(&self) -> QueryParser {
        self.parser
    }

    /// `IndexField` definitions for every leaf of the index schema.
    #[must_use]
    pub fn field_definitions(&self) -> Vec<Value> {
        self.index
            .schema
            .leaves()
            .into_iter()
            .filter_map(|(name, field_type)| index_field(&name, field_type))
            .collect()
    }

    /// Define every index field, retrying throttled calls.
    pub async fn define_fields(&self) -> Result<usize> {
        let definitions = self.field_definitions();
        for definition in &definitions {
            let outcome = retry("cloudsearch.define_field", &self.retry, || {
                self.client.define_field(definition)
            })
            .await;
            if let Err(err) = outcome {
                metrics::record_field_definitions(BACKEND, 1, false);
                return Err(err.into());
            }
        }
        metrics::record_field_definitions(BACKEND, definitions.len(), true);
        debug!(index = %self.index.name, fields = definitions.len(), "Index fields defined");
        Ok(definitions.len())
    }
}

/// CloudSearch type name and option block for a field kind.
fn index_field_type(kind: FieldKind) -> Option<(&'static str, &'static str)> {
    match kind {
        FieldKind::Integer => Some(("int", "IntOptions")),
        FieldKind::Double => Some(("double", "DoubleOptions")),
        FieldKind::String | FieldKind::Boolean => Some(("literal", "LiteralOptions")),
        FieldKind::StringArray => Some(("literal-array", "LiteralArrayOptions")),
        FieldKind::Text => Some(("text", "TextOptions")),
        FieldKind::TextArray => Some(("text-array", "TextArrayOptions")),
        FieldKind::Date => Some(("date", "DateOptions")),
        FieldKind::DateArray => Some(("date-array", "DateArrayOptions")),
        FieldKind::Struct => None,
    }
}

const OPTION_NAMES: [(&str, &str); 5] = [
    ("sortable", "SortEnabled"),
    ("searchable", "SearchEnabled"),
    ("returnable", "ReturnEnabled"),
    ("facetable", "FacetEnabled"),
    ("highlightable", "HighlightEnabled"),
];

fn index_field(name: &str, field_type: &FieldType) -> Option<Value> {
    let (type_name, options_key) = index_field_type(field_type.kind())?;
    let options: Map<String, Value> = OPTION_NAMES
        .iter()
        .filter_map(|(hint, option)| {
            field_type
                .flag(hint)
                .map(|enabled| ((*option).to_string(), Value::Bool(enabled)))
        })
        .collect();

    let mut definition = json!({"IndexFieldName": name, "IndexFieldType": type_name});
    if !options.is_empty() {
        definition[options_key] = Value::Object(options);
    }
    Some(definition)
}

#[async_trait]
impl<C> Executor for CloudSearchBackend<C>
where
    C: SearchClient<Request = CloudSearchRequest>,
{
    type Request = CloudSearchRequest;
    type Results = CloudSearchResults;

    fn index(&self) -> &SearchIndex {
        &self.index
    }

    fn compile(&self, query: &Query) -> Result<CloudSearchRequest> {
        CloudSearchTranslator::new(&self.index.schema, self.parser).visit_query(query)
    }

    async fn send(&self, request: &CloudSearchRequest) -> Result<CloudSearchResults> {
        debug!(index = %self.index.name, query = ?request.query, filter = ?request.filter_query, "CloudSearch search");
        let raw = self.client.search(request).await?;
        let results = CloudSearchResults::with_separator(raw, self.separator.as_str());
        metrics::record_search_results(BACKEND, results.len());
        Ok(results)
    }
}

#[async_trait]
impl<C> Indexer for CloudSearchBackend<C>
where
    C: SearchClient<Request = CloudSearchRequest>,
{
    fn index_name(&self) -> &str {
        &self.index.name
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn transform(&self, document: Document) -> Result<Value> {
        let id = document_id(&document)?;
        Ok(json!({
            "type": "add",
            "id": id,
            "fields": transform_fields(&document),
        }))
    }

    fn delete_envelope(&self, id: &str) -> Value {
        json!({"type": "delete", "id": id})
    }

    async fn publish_all(&self, operation: Operation, payloads: Vec<Value>) -> Result<()> {
        let count = payloads.len();
        for batch in split_payload(payloads, self.max_payload_bytes)? {
            metrics::record_batch_bytes(BACKEND, encoded_size(&batch)?);
            retry("cloudsearch.upload", &self.retry, || self.client.upload(&batch)).await?;
            debug!(index = %self.index.name, operation = operation.as_str(), documents = batch.len(), "CloudSearch batch uploaded");
        }
        metrics::record_documents_published(BACKEND, operation.as_str(), count);
        Ok(())
    }
}
