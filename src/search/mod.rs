// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search Infrastructure
//!
//! Backend-neutral queries compiled to CloudSearch and Elasticsearch.
//!
//! # Architecture
//!
//! ```text
//! QueryBuilder → Query (AST)
//!     ↓
//!     Validator (schema check, errors kept on the query)
//!     ↓
//!     ├─→ CloudSearchTranslator → structured / simple query strings
//!     └─→ ElasticsearchTranslator → JSON query DSL
//!     ↓
//! raw response → ResultSet → nested documents
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use search_bridge::schema::{Backend, FieldType, Schema, SearchIndex};
//! use search_bridge::search::{CloudSearchTranslator, Node, QueryBuilder, QueryParser};
//!
//! let index = Arc::new(SearchIndex::new(
//!     "things",
//!     Backend::CloudSearch,
//!     Schema::new()
//!         .field("an_integer", FieldType::integer())
//!         .field("a_string", FieldType::string()),
//! ));
//!
//! let mut query = QueryBuilder::new(index)
//!     .where_criteria(Node::equal("an_integer", 10).and(Node::not_equal("a_string", "value")))
//!     .build();
//! assert!(query.validate());
//!
//! let request = CloudSearchTranslator::translate(&query, QueryParser::Structured).unwrap();
//! assert_eq!(
//!     request.query.as_deref(),
//!     Some("(and (term field=an_integer 10) (not term field=a_string 'value'))")
//! );
//! ```

mod ast;
mod cloudsearch_translator;
mod elasticsearch_translator;
mod query_builder;
mod result_set;
mod validator;
mod visitor;

pub use ast::{
    Attribute, Between, Comparison, Direction, Expression, Node, NodeKind, Ordering, Query,
    QueryErrors, Value, SCORE, WILDCARD,
};
pub use cloudsearch_translator::{CloudSearchRequest, CloudSearchTranslator, QueryParser};
pub use elasticsearch_translator::{deep_merge, ElasticsearchTranslator, DEFAULT_SCROLL_KEEP_ALIVE};
pub use query_builder::QueryBuilder;
pub use result_set::{
    CloudSearchLayout, CloudSearchResults, ElasticsearchLayout, ElasticsearchResults,
    ResponseLayout, ResultSet, DEFAULT_SEPARATOR,
};
pub use validator::Validator;
pub use visitor::QueryVisitor;
