// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query AST
//!
//! Backend-neutral representation of one search request.
//!
//! ```text
//! Query
//!  ├─ Where(Node)           Node = Compare | Between | Not | And | Or
//!  ├─ Select([Attribute])
//!  ├─ Order([Ascending | Descending])
//!  ├─ Limit(Value) / Offset(Value)
//!  ├─ Filter(Node)
//!  └─ ScrollCursor(Value)
//! ```
//!
//! Only configured expressions are present. A [`Value`] carries no type of
//! its own: validators and translators read it against the attribute of the
//! criterion that holds it.
//!
//! # Example
//!
//! ```rust
//! use search_bridge::search::Node;
//!
//! let node = Node::equal("status", "active")
//!     .and(Node::greater_equal("age", 21))
//!     .or(Node::starts("name", "adm").negate());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::document::{field_name, format_date, parse_date, FieldValue};
use crate::error::{Result, SearchError};
use crate::schema::{Backend, FieldKind, SearchIndex};

use super::validator::Validator;

/// Concrete AST node kinds, used to key errors and name unsupported nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Attribute,
    Value,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Contains,
    Starts,
    FreeText,
    Fuzzy,
    GreaterAndLess,
    GreaterEqualAndLess,
    GreaterAndLessEqual,
    GreaterEqualAndLessEqual,
    Not,
    And,
    Or,
    Ascending,
    Descending,
    Where,
    Filter,
    Select,
    Order,
    Limit,
    Offset,
    ScrollCursor,
    Query,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Wildcard attribute matching any field.
pub const WILDCARD: &str = "*";
/// Relevance score pseudo-attribute.
pub const SCORE: &str = "_score";

/// Leaf naming a schema path, the wildcard, or the score sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: String,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }

    #[must_use]
    pub fn is_score(&self) -> bool {
        self.name == SCORE
    }

    /// Name as indexed: nesting dots become the flattening delimiter.
    #[must_use]
    pub fn field_name(&self) -> String {
        field_name(&self.name)
    }
}

impl From<&str> for Attribute {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Attribute {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Literal leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    literal: FieldValue,
}

impl Value {
    #[must_use]
    pub fn new(literal: impl Into<FieldValue>) -> Self {
        Self {
            literal: literal.into(),
        }
    }

    #[must_use]
    pub fn literal(&self) -> &FieldValue {
        &self.literal
    }

    /// The literal as compiled against a field of `kind`. RFC 3339 text on
    /// a date field becomes a UTC date.
    #[must_use]
    pub fn for_kind(&self, kind: Option<FieldKind>) -> Value {
        match kind {
            Some(kind) if kind.is_date() => Value {
                literal: as_date(&self.literal),
            },
            _ => self.clone(),
        }
    }

    /// Non-negative integer literal, as used by limit and offset.
    #[must_use]
    pub fn as_count(&self) -> Option<u64> {
        match self.literal {
            FieldValue::Integer(n) => u64::try_from(n).ok(),
            _ => None,
        }
    }

    /// Literal as a bare search term. Lists, nested documents and null have
    /// no term form.
    #[must_use]
    pub fn as_term(&self) -> Option<String> {
        match &self.literal {
            FieldValue::Text(text) => Some(text.clone()),
            FieldValue::Integer(n) => Some(n.to_string()),
            FieldValue::Double(f) => Some(f.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Date(date) => Some(format_date(date)),
            FieldValue::Null | FieldValue::List(_) | FieldValue::Nested(_) => None,
        }
    }
}

fn as_date(literal: &FieldValue) -> FieldValue {
    match literal {
        FieldValue::Text(text) => parse_date(text).map_or_else(|| literal.clone(), FieldValue::Date),
        FieldValue::List(items) => FieldValue::List(items.iter().map(as_date).collect()),
        other => other.clone(),
    }
}

/// Binary criteria over `[Attribute, Value]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Contains,
    Starts,
    FreeText,
    Fuzzy,
}

impl Comparison {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Comparison::Equal => NodeKind::Equal,
            Comparison::NotEqual => NodeKind::NotEqual,
            Comparison::Greater => NodeKind::Greater,
            Comparison::Less => NodeKind::Less,
            Comparison::GreaterEqual => NodeKind::GreaterEqual,
            Comparison::LessEqual => NodeKind::LessEqual,
            Comparison::Contains => NodeKind::Contains,
            Comparison::Starts => NodeKind::Starts,
            Comparison::FreeText => NodeKind::FreeText,
            Comparison::Fuzzy => NodeKind::Fuzzy,
        }
    }
}

/// Ternary "between" criteria over `[Attribute, low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Between {
    GreaterAndLess,
    GreaterEqualAndLess,
    GreaterAndLessEqual,
    GreaterEqualAndLessEqual,
}

impl Between {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Between::GreaterAndLess => NodeKind::GreaterAndLess,
            Between::GreaterEqualAndLess => NodeKind::GreaterEqualAndLess,
            Between::GreaterAndLessEqual => NodeKind::GreaterAndLessEqual,
            Between::GreaterEqualAndLessEqual => NodeKind::GreaterEqualAndLessEqual,
        }
    }

    #[must_use]
    pub fn lower_inclusive(&self) -> bool {
        matches!(self, Between::GreaterEqualAndLess | Between::GreaterEqualAndLessEqual)
    }

    #[must_use]
    pub fn upper_inclusive(&self) -> bool {
        matches!(self, Between::GreaterAndLessEqual | Between::GreaterEqualAndLessEqual)
    }
}

/// Criterion / operation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Compare {
        op: Comparison,
        attribute: Attribute,
        value: Value,
    },
    Between {
        op: Between,
        attribute: Attribute,
        low: Value,
        high: Value,
    },
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
}

impl Node {
    pub fn compare(op: Comparison, attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Node::Compare {
            op,
            attribute: attribute.into(),
            value: Value::new(value),
        }
    }

    pub fn between(
        op: Between,
        attribute: impl Into<Attribute>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Node::Between {
            op,
            attribute: attribute.into(),
            low: Value::new(low),
            high: Value::new(high),
        }
    }

    pub fn equal(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::Equal, attribute, value)
    }

    pub fn not_equal(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::NotEqual, attribute, value)
    }

    pub fn greater(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::Greater, attribute, value)
    }

    pub fn less(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::Less, attribute, value)
    }

    pub fn greater_equal(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::GreaterEqual, attribute, value)
    }

    pub fn less_equal(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::LessEqual, attribute, value)
    }

    pub fn contains(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::Contains, attribute, value)
    }

    pub fn starts(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::Starts, attribute, value)
    }

    pub fn free_text(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::FreeText, attribute, value)
    }

    pub fn fuzzy(attribute: impl Into<Attribute>, value: impl Into<FieldValue>) -> Self {
        Self::compare(Comparison::Fuzzy, attribute, value)
    }

    /// `low < attribute < high`
    pub fn greater_and_less(
        attribute: impl Into<Attribute>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Self::between(Between::GreaterAndLess, attribute, low, high)
    }

    /// `low <= attribute < high`
    pub fn greater_equal_and_less(
        attribute: impl Into<Attribute>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Self::between(Between::GreaterEqualAndLess, attribute, low, high)
    }

    /// `low < attribute <= high`
    pub fn greater_and_less_equal(
        attribute: impl Into<Attribute>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Self::between(Between::GreaterAndLessEqual, attribute, low, high)
    }

    /// `low <= attribute <= high`
    pub fn greater_equal_and_less_equal(
        attribute: impl Into<Attribute>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Self::between(Between::GreaterEqualAndLessEqual, attribute, low, high)
    }

    /// Combine with AND
    #[must_use]
    pub fn and(self, other: Node) -> Self {
        Node::And(vec![self, other])
    }

    /// Combine with OR
    #[must_use]
    pub fn or(self, other: Node) -> Self {
        Node::Or(vec![self, other])
    }

    /// Negate
    #[must_use]
    pub fn negate(self) -> Self {
        Node::Not(Box::new(self))
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Compare { op, .. } => op.kind(),
            Node::Between { op, .. } => op.kind(),
            Node::Not(_) => NodeKind::Not,
            Node::And(_) => NodeKind::And,
            Node::Or(_) => NodeKind::Or,
        }
    }
}

/// Sort direction for order qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

/// Order qualifier over one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ordering {
    Ascending(Attribute),
    Descending(Attribute),
}

impl Ordering {
    pub fn new(attribute: impl Into<Attribute>, direction: Direction) -> Self {
        match direction {
            Direction::Asc => Ordering::Ascending(attribute.into()),
            Direction::Desc => Ordering::Descending(attribute.into()),
        }
    }

    #[must_use]
    pub fn attribute(&self) -> &Attribute {
        match self {
            Ordering::Ascending(attribute) | Ordering::Descending(attribute) => attribute,
        }
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Ordering::Ascending(_) => NodeKind::Ascending,
            Ordering::Descending(_) => NodeKind::Descending,
        }
    }
}

/// Top-level clauses of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Where(Node),
    Select(Vec<Attribute>),
    Order(Vec<Ordering>),
    Limit(Value),
    Offset(Value),
    Filter(Node),
    ScrollCursor(Value),
}

impl Expression {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Expression::Where(_) => NodeKind::Where,
            Expression::Select(_) => NodeKind::Select,
            Expression::Order(_) => NodeKind::Order,
            Expression::Limit(_) => NodeKind::Limit,
            Expression::Offset(_) => NodeKind::Offset,
            Expression::Filter(_) => NodeKind::Filter,
            Expression::ScrollCursor(_) => NodeKind::ScrollCursor,
        }
    }
}

/// Validation messages grouped by the kind of node that failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryErrors {
    errors: BTreeMap<NodeKind, Vec<String>>,
}

impl QueryErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NodeKind, message: impl Into<String>) {
        self.errors.entry(kind).or_default().push(message.into());
    }

    #[must_use]
    pub fn get(&self, kind: NodeKind) -> &[String] {
        self.errors.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeKind, &Vec<String>)> {
        self.errors.iter()
    }
}

impl fmt::Display for QueryErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for messages in self.errors.values() {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Root of the AST, bound to the index it will run against.
#[derive(Debug, Clone)]
pub struct Query {
    index: Arc<SearchIndex>,
    expressions: Vec<Expression>,
    errors: QueryErrors,
}

impl Query {
    #[must_use]
    pub fn new(index: Arc<SearchIndex>, expressions: Vec<Expression>) -> Self {
        Self {
            index,
            expressions,
            errors: QueryErrors::new(),
        }
    }

    #[must_use]
    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.index.backend
    }

    #[must_use]
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    #[must_use]
    pub fn expression(&self, kind: NodeKind) -> Option<&Expression> {
        self.expressions.iter().find(|e| e.kind() == kind)
    }

    /// Errors from the most recent validation.
    #[must_use]
    pub fn errors(&self) -> &QueryErrors {
        &self.errors
    }

    /// Check attribute paths and value types against the index schema.
    pub fn validate(&mut self) -> bool {
        let mut validator = Validator::new(&self.index.schema);
        let valid = validator.validate(self);
        self.errors = validator.into_errors();
        valid
    }

    /// Validate and fail with the error map if anything is wrong.
    pub fn ensure_valid(&mut self) -> Result<()> {
        if self.validate() {
            Ok(())
        } else {
            Err(SearchError::InvalidQuery {
                errors: self.errors.clone(),
            })
        }
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.index.name == other.index.name && self.expressions == other.expressions
    }
}
