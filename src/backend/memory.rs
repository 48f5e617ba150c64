// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::SearchClient;
use crate::error::ClientError;

/// In-memory client that records every call and answers searches with a
/// canned response. Can be told to throttle the next few calls.
pub struct RecordingClient<R> {
    searches: Mutex<Vec<R>>,
    uploads: Mutex<Vec<Vec<Value>>>,
    definitions: Mutex<Vec<Value>>,
    response: Mutex<Value>,
    throttle_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl<R> RecordingClient<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            searches: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            definitions: Mutex::new(Vec::new()),
            response: Mutex::new(json!({})),
            throttle_remaining: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Response returned by every search
    #[must_use]
    pub fn with_response(self, response: Value) -> Self {
        *self.response.lock() = response;
        self
    }

    /// Fail the next `count` calls with [`ClientError::Throttled`]
    pub fn throttle_next(&self, count: usize) {
        self.throttle_remaining.store(count, Ordering::SeqCst);
    }

    /// Calls received, throttled ones included
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Upload batches in the order received
    #[must_use]
    pub fn uploads(&self) -> Vec<Vec<Value>> {
        self.uploads.lock().clone()
    }

    /// Every uploaded envelope, batches concatenated
    #[must_use]
    pub fn uploaded(&self) -> Vec<Value> {
        self.uploads.lock().concat()
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<Value> {
        self.definitions.lock().clone()
    }

    fn admit(&self) -> Result<(), ClientError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let throttled = self
            .throttle_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if throttled {
            return Err(ClientError::Throttled(format!("Rate exceeded on call {call}")));
        }
        Ok(())
    }
}

impl<R: Clone> RecordingClient<R> {
    #[must_use]
    pub fn searches(&self) -> Vec<R> {
        self.searches.lock().clone()
    }
}

impl<R> Default for RecordingClient<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R> SearchClient for RecordingClient<R>
where
    R: Clone + Send + Sync,
{
    type Request = R;

    async fn search(&self, request: &R) -> Result<Value, ClientError> {
        self.admit()?;
        self.searches.lock().push(request.clone());
        Ok(self.response.lock().clone())
    }

    async fn upload(&self, documents: &[Value]) -> Result<Value, ClientError> {
        self.admit()?;
        self.uploads.lock().push(documents.to_vec());
        Ok(json!({"status": "success", "adds": documents.len()}))
    }

    async fn define_field(&self, definition: &Value) -> Result<Value, ClientError> {
        self.admit()?;
        self.definitions.lock().push(definition.clone());
        Ok(json!({"acknowledged": true}))
    }
}
