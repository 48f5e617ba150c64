// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Decoding of raw search responses.
//!
//! Engines return every field of a hit as an array, flattened with the
//! indexing delimiter. Decoding a hit keeps only its `fields` payload,
//! collapses the arrays (one element becomes the scalar, several are joined
//! with the separator) and rebuilds the nested document.

use std::marker::PhantomData;

use serde_json::{Map, Value};

use crate::document::unflatten;

/// Where a backend keeps hits, totals and cursors in its response.
pub trait ResponseLayout {
    fn hits(raw: &Value) -> &[Value];

    fn total_count(raw: &Value) -> u64;

    fn cursor(raw: &Value) -> Option<&str>;

    fn fields(hit: &Value) -> Option<&Map<String, Value>> {
        hit.get("fields").and_then(Value::as_object)
    }
}

/// `{"hits": {"found": n, "cursor": "..", "hit": [{"id": .., "fields": {..}}]}}`
#[derive(Debug, Clone, Copy)]
pub struct CloudSearchLayout;

impl ResponseLayout for CloudSearchLayout {
    fn hits(raw: &Value) -> &[Value] {
        raw.pointer("/hits/hit")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn total_count(raw: &Value) -> u64 {
        raw.pointer("/hits/found").and_then(Value::as_u64).unwrap_or(0)
    }

    fn cursor(raw: &Value) -> Option<&str> {
        raw.pointer("/hits/cursor").and_then(Value::as_str)
    }
}

/// `{"_scroll_id": "..", "hits": {"total": {"value": n}, "hits": [{"_id": .., "fields": {..}}]}}`
#[derive(Debug, Clone, Copy)]
pub struct ElasticsearchLayout;

impl ResponseLayout for ElasticsearchLayout {
    fn hits(raw: &Value) -> &[Value] {
        raw.pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn total_count(raw: &Value) -> u64 {
        // Older clusters report a bare number
        match raw.pointer("/hits/total") {
            Some(Value::Number(total)) => total.as_u64().unwrap_or(0),
            Some(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
            None => 0,
        }
    }

    fn cursor(raw: &Value) -> Option<&str> {
        raw.get("_scroll_id").and_then(Value::as_str)
    }
}

/// Decoded view over one raw search response.
///
/// Decoding is lazy: every [`ResultSet::iter`] call walks the raw hits again.
#[derive(Debug, Clone)]
pub struct ResultSet<L> {
    raw: Value,
    separator: String,
    layout: PhantomData<L>,
}

pub type CloudSearchResults = ResultSet<CloudSearchLayout>;
pub type ElasticsearchResults = ResultSet<ElasticsearchLayout>;

/// Separator for multi-valued fields.
pub const DEFAULT_SEPARATOR: &str = "|";

impl<L: ResponseLayout> ResultSet<L> {
    #[must_use]
    pub fn new(raw: Value) -> Self {
        Self::with_separator(raw, DEFAULT_SEPARATOR)
    }

    #[must_use]
    pub fn with_separator(raw: Value, separator: impl Into<String>) -> Self {
        Self {
            raw,
            separator: separator.into(),
            layout: PhantomData,
        }
    }

    /// Undecoded response
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn iter(&self) -> impl Iterator<Item = Map<String, Value>> + '_ {
        L::hits(&self.raw)
            .iter()
            .map(move |hit| decode_hit(L::fields(hit), &self.separator))
    }

    #[must_use]
    pub fn documents(&self) -> Vec<Map<String, Value>> {
        self.iter().collect()
    }

    /// Hits in this page
    #[must_use]
    pub fn len(&self) -> usize {
        L::hits(&self.raw).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matches across all pages
    #[must_use]
    pub fn total_count(&self) -> u64 {
        L::total_count(&self.raw)
    }

    /// Cursor or scroll id for the next page
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        L::cursor(&self.raw)
    }
}

fn decode_hit(fields: Option<&Map<String, Value>>, separator: &str) -> Map<String, Value> {
    let Some(fields) = fields else {
        return Map::new();
    };
    let collapsed: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), collapse(value, separator)))
        .collect();
    unflatten(&collapsed)
}

/// One-element arrays become their element, longer ones a joined string.
fn collapse(value: &Value, separator: &str) -> Value {
    match value {
        Value::Array(items) => match items.as_slice() {
            [] => Value::Null,
            [single] => single.clone(),
            many => Value::String(
                many.iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(separator),
            ),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cloudsearch_response() -> Value {
        json!({
            "status": {"rid": "abc", "time-ms": 3},
            "hits": {
                "found": 42,
                "start": 0,
                "cursor": "next-page",
                "hit": [
                    {"id": "1", "fields": {
                        "title": ["Dune"],
                        "tags": ["scifi", "classic"],
                        "author__name": ["Frank Herbert"],
                        "author__born": ["1920"]
                    }},
                    {"id": "2", "fields": {"title": ["Emma"], "tags": []}}
                ]
            }
        })
    }

    #[test]
    fn test_cloudsearch_decoding() {
        let results = CloudSearchResults::new(cloudsearch_response());

        assert_eq!(results.total_count(), 42);
        assert_eq!(results.cursor(), Some("next-page"));
        assert_eq!(results.len(), 2);

        let documents = results.documents();
        assert_eq!(
            Value::Object(documents[0].clone()),
            json!({
                "title": "Dune",
                "tags": "scifi|classic",
                "author": {"name": "Frank Herbert", "born": "1920"}
            })
        );
        assert_eq!(Value::Object(documents[1].clone()), json!({"title": "Emma", "tags": null}));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let results = CloudSearchResults::new(cloudsearch_response());
        assert_eq!(results.iter().count(), 2);
        assert_eq!(results.iter().count(), 2);
    }

    #[test]
    fn test_elasticsearch_decoding() {
        let raw = json!({
            "_scroll_id": "scroll-1",
            "hits": {
                "total": {"value": 7, "relation": "eq"},
                "hits": [
                    {"_id": "a", "fields": {"count": [3], "labels": [1, 2]}},
                    {"_id": "b", "_source": {"ignored": true}}
                ]
            }
        });
        let results = ElasticsearchResults::with_separator(raw, ",");

        assert_eq!(results.total_count(), 7);
        assert_eq!(results.cursor(), Some("scroll-1"));
        let documents = results.documents();
        assert_eq!(Value::Object(documents[0].clone()), json!({"count": 3, "labels": "1,2"}));
        assert!(documents[1].is_empty());
    }

    #[test]
    fn test_elasticsearch_numeric_total() {
        let results = ElasticsearchResults::new(json!({"hits": {"total": 3, "hits": []}}));
        assert_eq!(results.total_count(), 3);
        assert!(results.is_empty());
        assert_eq!(results.cursor(), None);
    }

    #[test]
    fn test_missing_envelope() {
        let results = CloudSearchResults::new(json!({}));
        assert_eq!(results.total_count(), 0);
        assert!(results.documents().is_empty());
    }
}
