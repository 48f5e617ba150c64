// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search backends.
//!
//! A backend binds one [`SearchIndex`] to an externally owned
//! [`SearchClient`]. It executes queries (validate, compile, send, decode)
//! and publishes documents through the [`Indexer`](crate::indexing::Indexer)
//! pipeline.
//!
//! ```text
//! Query ──validate──→ compile ──→ SearchClient::search ──→ ResultSet
//! Indexable ──→ Indexer::transform ──→ split ──→ SearchClient::upload (retried)
//! ```

mod cloudsearch;
mod elasticsearch;
mod memory;

pub use cloudsearch::CloudSearchBackend;
pub use elasticsearch::{ElasticsearchBackend, ElasticsearchRequest};
pub use memory::RecordingClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ClientError, Result, SearchError};
use crate::metrics::{self, LatencyTimer};
use crate::schema::{Backend, SearchIndex};
use crate::search::Query;

/// Network client for one search engine, owned by the application.
///
/// Clients report rate limiting as [`ClientError::Throttled`]; only that
/// kind is retried.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Compiled request the client knows how to send.
    type Request: Send + Sync;

    async fn search(&self, request: &Self::Request) -> Result<Value, ClientError>;

    /// Upload a batch of add/delete envelopes.
    async fn upload(&self, documents: &[Value]) -> Result<Value, ClientError>;

    /// Define one index field or mapping.
    async fn define_field(&self, definition: &Value) -> Result<Value, ClientError>;
}

/// Runs queries against one index.
#[async_trait]
pub trait Executor: Send + Sync {
    type Request: Send + Sync;
    type Results: Send;

    fn index(&self) -> &SearchIndex;

    /// Compile a query into the backend request.
    fn compile(&self, query: &Query) -> Result<Self::Request>;

    /// Send a compiled request and decode the response.
    async fn send(&self, request: &Self::Request) -> Result<Self::Results>;

    /// Validate, compile and send. An invalid query fails with
    /// [`SearchError::InvalidQuery`] before anything is sent.
    async fn execute(&self, query: &mut Query) -> Result<Self::Results> {
        let backend = self.index().backend;
        ensure_backend(query.index(), backend)?;
        ensure_same_index(query.index(), self.index())?;

        if let Err(err) = query.ensure_valid() {
            metrics::record_search_query(backend.as_str(), "invalid");
            return Err(err);
        }
        let request = self.compile(query)?;

        let _timer = LatencyTimer::new(backend.as_str(), "search");
        let outcome = self.send(&request).await;
        let status = if outcome.is_ok() { "success" } else { "error" };
        metrics::record_search_query(backend.as_str(), status);
        outcome
    }
}

/// Fail unless the query's index is the one the executor is bound to.
pub fn ensure_same_index(query: &SearchIndex, bound: &SearchIndex) -> Result<()> {
    if query.name == bound.name {
        return Ok(());
    }
    Err(SearchError::IndexMismatch {
        query: query.name.clone(),
        bound: bound.name.clone(),
    })
}

/// Fail unless `index` lives on `backend`.
pub fn ensure_backend(index: &SearchIndex, backend: Backend) -> Result<()> {
    if index.backend == backend {
        return Ok(());
    }
    Err(SearchError::IncompatibleBackend {
        index: index.name.clone(),
        expected: index.backend.as_str(),
        actual: backend.as_str(),
    })
}
