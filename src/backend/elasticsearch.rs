// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Elasticsearch backend.
//!
//! Documents are uploaded as bulk actions:
//!
//! ```text
//! {"_op_type": "index", "_index": "books", "_id": "42", "_source": {"title": "Dune"}}
//! {"_op_type": "delete", "_index": "books", "_id": "42"}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
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
use crate::search::{ElasticsearchResults, ElasticsearchTranslator, Query, QueryVisitor};

const BACKEND: &str = "elasticsearch";

/// Search body addressed to one index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElasticsearchRequest {
    pub index: String,
    pub body: Value,
}

/// Elasticsearch index bound to one index definition.
pub struct ElasticsearchBackend<C> {
    client: Arc<C>,
    index: Arc<SearchIndex>,
    scroll_keep_alive: String,
    retry: RetryConfig,
    max_payload_bytes: usize,
    separator: String,
}

impl<C> ElasticsearchBackend<C>
where
    C: SearchClient<Request = ElasticsearchRequest>,
{
    /// Fails if `index` is not an Elasticsearch index.
    pub fn new(client: Arc<C>, index: Arc<SearchIndex>, config: &BridgeConfig) -> Result<Self> {
        ensure_backend(&index, Backend::Elasticsearch)?;
        Ok(Self {
            client,
            index,
            scroll_keep_alive: config.scroll_keep_alive.clone(),
            retry: RetryConfig::from(config),
            max_payload_bytes: config.elasticsearch_max_payload_bytes,
            separator: config.multi_value_separator.clone(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `{"properties": {...}}` mapping of every schema leaf.
    #[must_use]
    pub fn mapping(&self) -> Value {
        let properties: Map<String, Value> = self
            .index
            .schema
            .leaves()
            .into_iter()
            .filter_map(|(name, field_type)| mapping_type(field_type).map(|t| (name, json!({"type": t}))))
            .collect();
        json!({"properties": properties})
    }

    /// Put the index mapping, retrying throttled calls.
    pub async fn define_fields(&self) -> Result<usize> {
        let mapping = self.mapping();
        let count = mapping["properties"].as_object().map_or(0, Map::len);
        let outcome = retry("elasticsearch.put_mapping", &self.retry, || {
            self.client.define_field(&mapping)
        })
        .await;
        metrics::record_field_definitions(BACKEND, count, outcome.is_ok());
        outcome?;
        debug!(index = %self.index.name, fields = count, "Index mapping defined");
        Ok(count)
    }
}

fn mapping_type(field_type: &FieldType) -> Option<&'static str> {
    match field_type.kind() {
        FieldKind::Integer => Some("integer"),
        FieldKind::Double => Some("double"),
        FieldKind::String | FieldKind::StringArray => Some("keyword"),
        FieldKind::Text | FieldKind::TextArray => {
            if field_type.flag("analyzed") == Some(false) {
                Some("keyword")
            } else {
                Some("text")
            }
        }
        FieldKind::Date | FieldKind::DateArray => Some("date"),
        FieldKind::Boolean => Some("boolean"),
        FieldKind::Struct => None,
    }
}

#[async_trait]
impl<C> Executor for ElasticsearchBackend<C>
where
    C: SearchClient<Request = ElasticsearchRequest>,
{
    type Request = ElasticsearchRequest;
    type Results = ElasticsearchResults;

    fn index(&self) -> &SearchIndex {
        &self.index
    }

    fn compile(&self, query: &Query) -> Result<ElasticsearchRequest> {
        Ok(ElasticsearchRequest {
            index: self.index.name.clone(),
            body: ElasticsearchTranslator::new(&self.index.schema)
                .with_scroll_keep_alive(self.scroll_keep_alive.as_str())
                .visit_query(query)?,
        })
    }

    async fn send(&self, request: &ElasticsearchRequest) -> Result<ElasticsearchResults> {
        debug!(index = %request.index, body = %request.body, "Elasticsearch search");
        let raw = self.client.search(request).await?;
        let results = ElasticsearchResults::with_separator(raw, self.separator.as_str());
        metrics::record_search_results(BACKEND, results.len());
        Ok(results)
    }
}

#[async_trait]
impl<C> Indexer for ElasticsearchBackend<C>
where
    C: SearchClient<Request = ElasticsearchRequest>,
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
            "_op_type": "index",
            "_index": self.index.name,
            "_id": id,
            "_source": transform_fields(&document),
        }))
    }

    fn delete_envelope(&self, id: &str) -> Value {
        json!({"_op_type": "delete", "_index": self.index.name, "_id": id})
    }

    async fn publish_all(&self, operation: Operation, payloads: Vec<Value>) -> Result<()> {
        let count = payloads.len();
        for batch in split_payload(payloads, self.max_payload_bytes)? {
            metrics::record_batch_bytes(BACKEND, encoded_size(&batch)?);
            retry("elasticsearch.bulk", &self.retry, || self.client.upload(&batch)).await?;
            debug!(index = %self.index.name, operation = operation.as_str(), actions = batch.len(), "Elasticsearch bulk sent");
        }
        metrics::record_documents_published(BACKEND, operation.as_str(), count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingClient;
    use crate::error::SearchError;
    use crate::schema::Schema;
    use crate::search::{Node, NodeKind, QueryBuilder};

    fn index() -> Arc<SearchIndex> {
        Arc::new(SearchIndex::new(
            "books",
            Backend::Elasticsearch,
            Schema::new()
                .field("id", FieldType::string())
                .field("year", FieldType::integer())
                .field("rating", FieldType::double())
                .field("title", FieldType::text())
                .field("code", FieldType::text().analyzed(false))
                .field("released", FieldType::date())
                .field("available", FieldType::boolean())
                .nested("author", Schema::new().field("name", FieldType::string_array())),
        ))
    }

    type Client = RecordingClient<ElasticsearchRequest>;

    fn backend(client: Arc<Client>) -> ElasticsearchBackend<Client> {
        ElasticsearchBackend::new(client, index(), &BridgeConfig::default())
            .unwrap()
            .with_retry(RetryConfig::test())
    }

    #[test]
    fn test_mapping() {
        let backend = backend(Arc::new(Client::new()));
        assert_eq!(
            backend.mapping(),
            json!({"properties": {
                "id": {"type": "keyword"},
                "year": {"type": "integer"},
                "rating": {"type": "double"},
                "title": {"type": "text"},
                "code": {"type": "keyword"},
                "released": {"type": "date"},
                "available": {"type": "boolean"},
                "author__name": {"type": "keyword"}
            }})
        );
    }

    #[tokio::test]
    async fn test_define_fields_sends_one_mapping() {
        let client = Arc::new(Client::new());
        client.throttle_next(2);
        let backend = backend(client.clone());

        assert_eq!(backend.define_fields().await.unwrap(), 8);
        assert_eq!(client.definitions(), vec![backend.mapping()]);
        assert_eq!(client.calls(), 3);
    }

    #[test]
    fn test_envelopes() {
        let backend = backend(Arc::new(Client::new()));
        let document = Document::new().with("id", "9").with("available", false).with("title", "");

        assert_eq!(
            backend.transform(document).unwrap(),
            json!({"_op_type": "index", "_index": "books", "_id": "9",
                   "_source": {"id": "9", "available": "false"}})
        );
        assert_eq!(
            backend.delete_envelope("9"),
            json!({"_op_type": "delete", "_index": "books", "_id": "9"})
        );
    }

    #[tokio::test]
    async fn test_execute_uses_configured_scroll_keep_alive() {
        let client = Arc::new(Client::new().with_response(json!({
            "_scroll_id": "next",
            "hits": {"total": {"value": 0}, "hits": []}
        })));
        let config = BridgeConfig {
            scroll_keep_alive: "2m".into(),
            ..Default::default()
        };
        let backend = ElasticsearchBackend::new(client.clone(), index(), &config).unwrap();

        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::greater("year", 2000))
            .scroll_cursor("prev")
            .build();
        let results = backend.execute(&mut query).await.unwrap();

        assert_eq!(results.cursor(), Some("next"));
        assert_eq!(
            client.searches(),
            vec![ElasticsearchRequest {
                index: "books".into(),
                body: json!({
                    "query": {"range": {"year": {"gt": 2000}}},
                    "scroll": "2m",
                    "scroll_id": "prev"
                }),
            }]
        );
    }

    #[tokio::test]
    async fn test_query_for_another_index_is_refused() {
        let client = Arc::new(Client::new());
        let backend = backend(client.clone());
        let users = Arc::new(SearchIndex::new(
            "users",
            Backend::Elasticsearch,
            Schema::new().field("name", FieldType::string()),
        ));

        let mut query = QueryBuilder::new(users)
            .where_criteria(Node::equal("name", "x"))
            .build();
        match backend.execute(&mut query).await {
            Err(SearchError::IndexMismatch { query: name, bound }) => {
                assert_eq!(name, "users");
                assert_eq!(bound, "books");
            }
            other => panic!("Expected IndexMismatch, got {other:?}"),
        }
        assert!(client.searches().is_empty());
    }

    #[tokio::test]
    async fn test_rfc3339_date_criteria_are_sent_in_utc() {
        let client = Arc::new(Client::new());
        let backend = backend(client.clone());

        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::greater("released", "2020-01-01T05:00:00.123+02:00"))
            .build();
        backend.execute(&mut query).await.unwrap();
        assert_eq!(
            client.searches()[0].body,
            json!({"query": {"range": {"released": {"gt": "2020-01-01T03:00:00Z"}}}})
        );
    }

    #[tokio::test]
    async fn test_invalid_query_is_not_sent() {
        let client = Arc::new(Client::new());
        let backend = backend(client.clone());

        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::equal("missing_field", 1))
            .build();
        match backend.execute(&mut query).await {
            Err(SearchError::InvalidQuery { errors }) => {
                assert_eq!(
                    errors.get(NodeKind::Attribute),
                    ["Attribute 'missing_field' in Equal missing from schema".to_string()]
                );
            }
            other => panic!("Expected InvalidQuery, got {other:?}"),
        }
        assert_eq!(client.calls(), 0);
    }
}
