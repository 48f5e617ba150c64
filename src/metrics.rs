// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for search-bridge.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `search_bridge_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for size histograms
//!
//! # Labels
//! - `backend`: cloudsearch, elasticsearch
//! - `operation`: search, publish, delete, define_fields
//! - `status`: success, error, invalid

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

// ═══════════════════════════════════════════════════════════════════════════
// SEARCH
// ═══════════════════════════════════════════════════════════════════════════

/// Record a search query execution
pub fn record_search_query(backend: &str, status: &str) {
    counter!(
        "search_bridge_search_queries_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search result count
pub fn record_search_results(backend: &str, count: usize) {
    histogram!(
        "search_bridge_search_results",
        "backend" => backend.to_string()
    )
    .record(count as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// INDEXING
// ═══════════════════════════════════════════════════════════════════════════

/// Record documents handed to the backend
pub fn record_documents_published(backend: &str, operation: &str, count: usize) {
    counter!(
        "search_bridge_documents_total",
        "backend" => backend.to_string(),
        "operation" => operation.to_string()
    )
    .increment(count as u64);
}

/// Record documents that failed preparation and were left out of a batch
pub fn record_documents_rejected(backend: &str, count: usize) {
    counter!(
        "search_bridge_documents_rejected_total",
        "backend" => backend.to_string()
    )
    .increment(count as u64);
}

/// Record encoded size of one upload
pub fn record_batch_bytes(backend: &str, bytes: usize) {
    histogram!(
        "search_bridge_batch_bytes",
        "backend" => backend.to_string()
    )
    .record(bytes as f64);
}

/// Record a payload that had to be split
pub fn record_batch_split(groups: usize) {
    counter!("search_bridge_batch_splits_total").increment(1);
    histogram!("search_bridge_batch_split_groups").record(groups as f64);
}

/// Record field or mapping definitions sent
pub fn record_field_definitions(backend: &str, count: usize, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "search_bridge_field_definitions_total",
        "backend" => backend.to_string(),
        "status" => status
    )
    .increment(count as u64);
}

// ═══════════════════════════════════════════════════════════════════════════
// RESILIENCE
// ═══════════════════════════════════════════════════════════════════════════

/// Record one retried transient failure
pub fn record_retry(operation: &str) {
    counter!(
        "search_bridge_retries_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record an operation that gave up after its last attempt
pub fn record_retry_exhausted(operation: &str) {
    counter!(
        "search_bridge_retries_exhausted_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(backend: &str, operation: &str, duration: Duration) {
    histogram!(
        "search_bridge_operation_seconds",
        "backend" => backend.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records latency on drop
pub struct LatencyTimer {
    backend: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(backend: &'static str, operation: &'static str) -> Self {
        Self {
            backend,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.backend, self.operation, self.start.elapsed());
    }
}
