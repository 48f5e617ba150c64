// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Builder
//!
//! Fluent accumulator for the sparse set of clauses a query may carry.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use search_bridge::schema::{Backend, FieldType, Schema, SearchIndex};
//! use search_bridge::search::{Direction, Node, QueryBuilder};
//!
//! let index = Arc::new(SearchIndex::new(
//!     "users",
//!     Backend::Elasticsearch,
//!     Schema::new().field("name", FieldType::string()).field("age", FieldType::integer()),
//! ));
//!
//! let query = QueryBuilder::new(index)
//!     .where_criteria(Node::equal("name", "Alice").and(Node::greater("age", 25)))
//!     .select(["name"])
//!     .order("age", Direction::Desc)
//!     .limit(20)
//!     .build();
//!
//! assert_eq!(query.expressions().len(), 4);
//! ```

use std::sync::Arc;

use crate::schema::SearchIndex;

use super::ast::{Attribute, Direction, Expression, Node, Ordering, Query, Value};

/// Builder for queries against one index.
///
/// `where_criteria`, `filter`, `limit`, `offset` and `scroll_cursor`
/// overwrite; `select` and `order` append.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    index: Arc<SearchIndex>,
    where_node: Option<Node>,
    filter: Option<Node>,
    select: Vec<Attribute>,
    order: Vec<Ordering>,
    limit: Option<u64>,
    offset: Option<u64>,
    scroll_cursor: Option<String>,
}

impl QueryBuilder {
    /// Create a new query builder
    #[must_use]
    pub fn new(index: Arc<SearchIndex>) -> Self {
        Self {
            index,
            where_node: None,
            filter: None,
            select: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            scroll_cursor: None,
        }
    }

    /// Main search criteria
    #[must_use]
    pub fn where_criteria(mut self, node: Node) -> Self {
        self.where_node = Some(node);
        self
    }

    /// Criteria that restrict results without affecting relevance
    #[must_use]
    pub fn filter(mut self, node: Node) -> Self {
        self.filter = Some(node);
        self
    }

    /// Add projected attributes
    #[must_use]
    pub fn select<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Attribute>,
    {
        self.select.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Add an order qualifier
    #[must_use]
    pub fn order(mut self, attribute: impl Into<Attribute>, direction: Direction) -> Self {
        self.order.push(Ordering::new(attribute, direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Continue from a backend-issued cursor
    #[must_use]
    pub fn scroll_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.scroll_cursor = Some(cursor.into());
        self
    }

    /// Build the query.
    ///
    /// Clauses are appended in a fixed order (where, select, order, limit,
    /// offset, filter, scroll cursor) and only when configured.
    #[must_use]
    pub fn build(&self) -> Query {
        let mut expressions = Vec::new();
        if let Some(node) = &self.where_node {
            expressions.push(Expression::Where(node.clone()));
        }
        if !self.select.is_empty() {
            expressions.push(Expression::Select(self.select.clone()));
        }
        if !self.order.is_empty() {
            expressions.push(Expression::Order(self.order.clone()));
        }
        if let Some(limit) = self.limit {
            expressions.push(Expression::Limit(Value::new(count_literal(limit))));
        }
        if let Some(offset) = self.offset {
            expressions.push(Expression::Offset(Value::new(count_literal(offset))));
        }
        if let Some(node) = &self.filter {
            expressions.push(Expression::Filter(node.clone()));
        }
        if let Some(cursor) = &self.scroll_cursor {
            expressions.push(Expression::ScrollCursor(Value::new(cursor.as_str())));
        }
        Query::new(self.index.clone(), expressions)
    }
}

fn count_literal(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Backend, Schema};
    use crate::search::NodeKind;

    fn index() -> Arc<SearchIndex> {
        Arc::new(SearchIndex::new("items", Backend::Elasticsearch, Schema::new()))
    }

    fn kinds(query: &Query) -> Vec<NodeKind> {
        query.expressions().iter().map(Expression::kind).collect()
    }

    #[test]
    fn test_empty_builder_builds_empty_query() {
        let query = QueryBuilder::new(index()).build();
        assert!(query.expressions().is_empty());
    }

    #[test]
    fn test_only_configured_expressions_in_fixed_order() {
        let query = QueryBuilder::new(index())
            .scroll_cursor("abc")
            .filter(Node::equal("a", 1))
            .limit(5)
            .where_criteria(Node::equal("b", 2))
            .build();

        assert_eq!(
            kinds(&query),
            vec![NodeKind::Where, NodeKind::Limit, NodeKind::Filter, NodeKind::ScrollCursor]
        );
    }

    #[test]
    fn test_all_expressions() {
        let query = QueryBuilder::new(index())
            .where_criteria(Node::equal("a", 1))
            .select(["a"])
            .order("a", Direction::Asc)
            .limit(10)
            .offset(20)
            .filter(Node::equal("b", 2))
            .scroll_cursor("cursor")
            .build();

        assert_eq!(
            kinds(&query),
            vec![
                NodeKind::Where,
                NodeKind::Select,
                NodeKind::Order,
                NodeKind::Limit,
                NodeKind::Offset,
                NodeKind::Filter,
                NodeKind::ScrollCursor,
            ]
        );
    }

    #[test]
    fn test_where_and_limit_overwrite() {
        let query = QueryBuilder::new(index())
            .where_criteria(Node::equal("a", 1))
            .where_criteria(Node::equal("a", 2))
            .limit(1)
            .limit(7)
            .build();

        assert_eq!(
            query.expression(NodeKind::Where),
            Some(&Expression::Where(Node::equal("a", 2)))
        );
        assert_eq!(
            query.expression(NodeKind::Limit),
            Some(&Expression::Limit(Value::new(7)))
        );
    }

    #[test]
    fn test_select_and_order_append() {
        let query = QueryBuilder::new(index())
            .select(["a"])
            .select(["b", "c"])
            .order("a", Direction::Asc)
            .order("b", Direction::Desc)
            .build();

        assert_eq!(
            query.expression(NodeKind::Select),
            Some(&Expression::Select(vec!["a".into(), "b".into(), "c".into()]))
        );
        assert_eq!(
            query.expression(NodeKind::Order),
            Some(&Expression::Order(vec![
                Ordering::Ascending("a".into()),
                Ordering::Descending("b".into()),
            ]))
        );
    }

    #[test]
    fn test_builds_are_independent() {
        let builder = QueryBuilder::new(index()).where_criteria(Node::equal("a", 1));
        let first = builder.build();
        let second = builder.build();
        assert_eq!(first, second);
    }
}
