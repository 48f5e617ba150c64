//! # Search Bridge
//!
//! Describe documents and searches once, compile them for CloudSearch or
//! Elasticsearch.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Write path                           │
//! │  Indexable → ContentManager::extract → Document            │
//! │  Indexer: prepare → transform (flatten a.b → a__b)         │
//! │  publish_all: split by payload size, retry throttling      │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Read path                            │
//! │  QueryBuilder → Query (AST) → Validator (schema)           │
//! │  CloudSearchTranslator / ElasticsearchTranslator           │
//! │  SearchClient::search → ResultSet (unflattened documents)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use search_bridge::backend::{CloudSearchBackend, Executor, RecordingClient};
//! use search_bridge::schema::{Backend, FieldType, Schema, SearchIndex};
//! use search_bridge::search::{CloudSearchRequest, Direction, Node, QueryBuilder};
//! use search_bridge::BridgeConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), search_bridge::SearchError> {
//!     let index = Arc::new(SearchIndex::new(
//!         "books",
//!         Backend::CloudSearch,
//!         Schema::new()
//!             .field("title", FieldType::text())
//!             .field("year", FieldType::integer().sortable(true)),
//!     ));
//!
//!     // Any SearchClient works; the recording client keeps calls in memory
//!     let client = Arc::new(RecordingClient::<CloudSearchRequest>::new());
//!     let backend = CloudSearchBackend::new(client, index.clone(), &BridgeConfig::default())?;
//!
//!     let mut query = QueryBuilder::new(index)
//!         .where_criteria(Node::greater_equal("year", 1990))
//!         .order("year", Direction::Desc)
//!         .limit(10)
//!         .build();
//!
//!     for document in backend.execute(&mut query).await?.iter() {
//!         println!("{document:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: field types, content managers, index registry
//! - [`document`]: typed documents and flattening
//! - [`search`]: query AST, builder, validator, translators, result sets
//! - [`backend`]: client and executor traits, CloudSearch and Elasticsearch backends
//! - [`indexing`]: the put/delete pipeline and payload splitting
//! - [`resilience`]: retry of throttled calls

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod indexing;
pub mod metrics;
pub mod resilience;
pub mod schema;
pub mod search;

pub use backend::{CloudSearchBackend, ElasticsearchBackend, Executor, SearchClient};
pub use config::BridgeConfig;
pub use document::{Document, FieldValue};
pub use error::{ClientError, Result, SearchError};
pub use indexing::{Indexer, PublishReport};
pub use resilience::retry::RetryConfig;
pub use schema::{IndexRegistry, Indexable, Schema, SearchIndex};
pub use search::{Query, QueryBuilder};
