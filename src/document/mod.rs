// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Documents extracted from application objects.
//!
//! A [`Document`] keeps typed values (including dates) until the indexing
//! pipeline renders it to JSON, so the transform step can format dates and
//! booleans the way each backend expects.

mod flatten;

pub use flatten::{field_name, flatten, unflatten, DELIMITER};

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// A typed document slot value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Text(String),
    Date(DateTime<Utc>),
    List(Vec<FieldValue>),
    Nested(Document),
}

impl FieldValue {
    /// Short name of the runtime kind, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Double(_) => "double",
            FieldValue::Text(_) => "text",
            FieldValue::Date(_) => "date",
            FieldValue::List(_) => "list",
            FieldValue::Nested(_) => "document",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Render to JSON. Dates become UTC RFC 3339 strings.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(n) => Value::Number((*n).into()),
            FieldValue::Double(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Date(d) => Value::String(format_date(d)),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Nested(doc) => Value::Object(doc.to_json()),
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ` in UTC.
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse RFC 3339 text (any offset) into a UTC date.
#[must_use]
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Double(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::Date(d) => write!(f, "{}", format_date(d)),
            FieldValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            FieldValue::Nested(doc) => write!(f, "{}", Value::Object(doc.to_json())),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl From<Document> for FieldValue {
    fn from(value: Document) -> Self {
        FieldValue::Nested(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Ordered field name -> value map produced by a content manager.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: IndexMap<String, FieldValue>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Merge another document into this one; its fields win on conflict.
    pub fn merge(&mut self, other: Document) {
        self.fields.extend(other.fields);
    }

    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_dates_render_as_utc_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(FieldValue::from(date).to_json(), json!("2024-03-09T07:05:01Z"));
    }

    #[test]
    fn test_nested_document_to_json() {
        let author = Document::new().with("name", "Ann").with("age", 41);
        let doc = Document::new()
            .with("id", 7)
            .with("tags", vec!["a", "b"])
            .with("author", author)
            .with("draft", false)
            .with("score", Option::<f64>::None);

        assert_eq!(
            Value::Object(doc.to_json()),
            json!({
                "id": 7,
                "tags": ["a", "b"],
                "author": {"name": "Ann", "age": 41},
                "draft": false,
                "score": null
            })
        );
    }

    #[test]
    fn test_display_quotes_text() {
        assert_eq!(FieldValue::from("abc").to_string(), "\"abc\"");
        assert_eq!(FieldValue::from(10).to_string(), "10");
        assert_eq!(FieldValue::from(vec![1, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_merge_overrides() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        doc.merge(Document::new().with("b", 3));
        assert_eq!(doc.get("b"), Some(&FieldValue::Integer(3)));
        assert_eq!(doc.len(), 2);
    }
}
