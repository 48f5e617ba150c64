// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Payload-size batch splitting.
//!
//! Upload endpoints cap the encoded size of a single request. A batch over
//! the cap is cut into `ceil(size / max)` contiguous groups of equal length;
//! a group that is still too large (documents of uneven size) is cut again.
//! A document that alone exceeds the cap cannot be sent at all.
//!
//! # Example
//!
//! ```
//! use search_bridge::indexing::partition;
//!
//! let groups = partition((0..8).collect::<Vec<_>>(), 32, 10);
//! assert_eq!(groups, vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7]]);
//! ```

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, SearchError};

/// Cut `items` into `ceil(encoded_size / max)` contiguous groups of equal
/// length (the last may be shorter). Order is preserved.
#[must_use]
pub fn partition<T>(items: Vec<T>, encoded_size: usize, max: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    if max == 0 || encoded_size <= max {
        return vec![items];
    }
    let groups = encoded_size.div_ceil(max);
    let chunk = items.len().div_ceil(groups).max(1);

    let mut result = Vec::with_capacity(groups);
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        result.push(items.by_ref().take(chunk).collect());
    }
    result
}

/// Encoded size of a JSON payload.
pub fn encoded_size<T: serde::Serialize + ?Sized>(payload: &T) -> Result<usize> {
    Ok(serde_json::to_vec(payload)?.len())
}

/// Split documents into uploads that each encode to at most `max` bytes.
pub fn split_payload(documents: Vec<Value>, max: usize) -> Result<Vec<Vec<Value>>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }
    let size = encoded_size(&documents)?;
    if size <= max {
        return Ok(vec![documents]);
    }

    for document in &documents {
        let document_size = encoded_size(document)?;
        if document_size > max {
            return Err(SearchError::PayloadTooLarge {
                size: document_size,
                max,
            });
        }
    }

    let count = documents.len();
    let groups = partition(documents, size, max);
    info!(documents = count, bytes = size, max, groups = groups.len(), "Splitting oversized batch");
    crate::metrics::record_batch_split(groups.len());

    let mut batches = Vec::with_capacity(groups.len());
    for group in groups {
        if group.len() == 1 {
            // Fits on its own; array framing is the client's concern
            batches.push(group);
            continue;
        }
        if encoded_size(&group)? > max {
            debug!(documents = group.len(), "Group still over the limit, splitting again");
            batches.extend(split_payload(group, max)?);
        } else {
            batches.push(group);
        }
    }
    Ok(batches)
}
