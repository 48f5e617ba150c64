// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Field definitions: what to read from a source object and how to index it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use super::content::Indexable;
use crate::document::{parse_date, FieldValue};
use crate::error::{Result, SearchError};

/// Field type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Double,
    String,
    StringArray,
    Text,
    TextArray,
    Date,
    DateArray,
    Boolean,
    /// Nested document built from one or more source types
    Struct,
}

impl FieldKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::StringArray => "string_array",
            FieldKind::Text => "text",
            FieldKind::TextArray => "text_array",
            FieldKind::Date => "date",
            FieldKind::DateArray => "date_array",
            FieldKind::Boolean => "boolean",
            FieldKind::Struct => "struct",
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Double)
    }

    #[must_use]
    pub fn is_date(&self) -> bool {
        matches!(self, FieldKind::Date | FieldKind::DateArray)
    }

    /// Whether a query literal of this runtime kind can be compared
    /// against a field of this type.
    #[must_use]
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            FieldKind::Integer => matches!(value, FieldValue::Integer(_)),
            FieldKind::Double => matches!(value, FieldValue::Integer(_) | FieldValue::Double(_)),
            FieldKind::String | FieldKind::Text => matches!(value, FieldValue::Text(_)),
            FieldKind::StringArray | FieldKind::TextArray => match value {
                FieldValue::Text(_) => true,
                FieldValue::List(items) => items.iter().all(|i| matches!(i, FieldValue::Text(_))),
                _ => false,
            },
            FieldKind::Date => is_date_like(value),
            FieldKind::DateArray => match value {
                FieldValue::List(items) => items.iter().all(is_date_like),
                other => is_date_like(other),
            },
            FieldKind::Boolean => matches!(value, FieldValue::Bool(_)),
            FieldKind::Struct => false,
        }
    }
}

fn is_date_like(value: &FieldValue) -> bool {
    match value {
        FieldValue::Date(_) => true,
        FieldValue::Text(s) => parse_date(s).is_some(),
        _ => false,
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = SearchError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "integer" => Ok(FieldKind::Integer),
            "double" => Ok(FieldKind::Double),
            "string" => Ok(FieldKind::String),
            "string_array" => Ok(FieldKind::StringArray),
            "text" => Ok(FieldKind::Text),
            "text_array" => Ok(FieldKind::TextArray),
            "date" => Ok(FieldKind::Date),
            "date_array" => Ok(FieldKind::DateArray),
            "boolean" => Ok(FieldKind::Boolean),
            "struct" => Ok(FieldKind::Struct),
            other => Err(SearchError::InvalidField(format!("unknown field type '{other}'"))),
        }
    }
}

/// A field type tag plus backend hints (sortable, searchable, ...).
///
/// Hints are free-form; each backend reads the ones it understands when
/// defining fields and ignores the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    kind: FieldKind,
    options: BTreeMap<String, Value>,
}

impl FieldType {
    #[must_use]
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            options: BTreeMap::new(),
        }
    }

    /// Construct from a tag string such as `"string_array"`.
    pub fn parse(tag: &str) -> Result<Self> {
        Ok(Self::new(tag.parse()?))
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    #[must_use]
    pub fn double() -> Self {
        Self::new(FieldKind::Double)
    }

    #[must_use]
    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    #[must_use]
    pub fn string_array() -> Self {
        Self::new(FieldKind::StringArray)
    }

    #[must_use]
    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    #[must_use]
    pub fn text_array() -> Self {
        Self::new(FieldKind::TextArray)
    }

    #[must_use]
    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    #[must_use]
    pub fn date_array() -> Self {
        Self::new(FieldKind::DateArray)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn sortable(self, enabled: bool) -> Self {
        self.option("sortable", enabled)
    }

    #[must_use]
    pub fn searchable(self, enabled: bool) -> Self {
        self.option("searchable", enabled)
    }

    #[must_use]
    pub fn returnable(self, enabled: bool) -> Self {
        self.option("returnable", enabled)
    }

    #[must_use]
    pub fn facetable(self, enabled: bool) -> Self {
        self.option("facetable", enabled)
    }

    #[must_use]
    pub fn highlightable(self, enabled: bool) -> Self {
        self.option("highlightable", enabled)
    }

    #[must_use]
    pub fn analyzed(self, enabled: bool) -> Self {
        self.option("analyzed", enabled)
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// Boolean hint, if set.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }
}

/// The raw value a field evaluates to on a source object.
#[derive(Clone)]
pub enum Slot {
    /// The object has no such property
    Absent,
    Value(FieldValue),
    /// An associated object that can produce its own document
    Object(Arc<dyn Indexable>),
}

impl Slot {
    pub fn value(value: impl Into<FieldValue>) -> Self {
        Slot::Value(value.into())
    }

    pub fn object(object: Arc<dyn Indexable>) -> Self {
        Slot::Object(object)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Absent => write!(f, "Absent"),
            Slot::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Slot::Object(o) => f.debug_tuple("Object").field(&o.identity()).finish(),
        }
    }
}

type ComputeFn = dyn Fn(&dyn Indexable) -> Slot + Send + Sync;

/// How a field reads its value from the source object.
#[derive(Clone)]
pub enum Accessor {
    Property(String),
    Computed(Arc<ComputeFn>),
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Property(name) => f.debug_tuple("Property").field(name).finish(),
            Accessor::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

/// One schema entry of a content manager.
#[derive(Debug, Clone)]
pub struct Field {
    accessor: Accessor,
    field_type: FieldType,
    from: Vec<String>,
}

impl Field {
    /// Build a field, checking that source types are given exactly when the
    /// type is `Struct`.
    pub fn new(accessor: Accessor, field_type: FieldType, from: Vec<String>) -> Result<Self> {
        let field = Self {
            accessor,
            field_type,
            from,
        };
        field.check()?;
        Ok(field)
    }

    /// Read a named property of the source object.
    #[must_use]
    pub fn property(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            accessor: Accessor::Property(name.into()),
            field_type,
            from: Vec::new(),
        }
    }

    /// Compute the value from the source object.
    pub fn computed<F>(compute: F, field_type: FieldType) -> Self
    where
        F: Fn(&dyn Indexable) -> Slot + Send + Sync + 'static,
    {
        Self {
            accessor: Accessor::Computed(Arc::new(compute)),
            field_type,
            from: Vec::new(),
        }
    }

    /// A nested document read from `property`, shaped by the content of
    /// the `from` source types.
    pub fn nested<I, S>(property: impl Into<String>, from: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accessor: Accessor::Property(property.into()),
            field_type: FieldType::new(FieldKind::Struct),
            from: from.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        match (self.field_type.kind(), self.from.is_empty()) {
            (FieldKind::Struct, true) => Err(SearchError::InvalidField(format!(
                "struct field {:?} needs at least one source type",
                self.accessor
            ))),
            (kind, false) if kind != FieldKind::Struct => Err(SearchError::InvalidField(format!(
                "{kind} field {:?} cannot name source types",
                self.accessor
            ))),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.field_type.kind()
    }

    #[must_use]
    pub fn from_types(&self) -> &[String] {
        &self.from
    }

    /// Evaluate the accessor against the source object.
    #[must_use]
    pub fn evaluate(&self, object: &dyn Indexable) -> Slot {
        match &self.accessor {
            Accessor::Property(name) => object.read(name),
            Accessor::Computed(compute) => compute(object),
        }
    }
}
