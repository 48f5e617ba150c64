// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Schema validation of a query AST.
//!
//! Read-only walk over every node. Attribute paths must resolve in the
//! index schema; values must fit the declared type of the attribute they are
//! compared against. Any failure makes the whole traversal invalid.

use crate::error::Result;
use crate::schema::{Schema, SchemaEntry};

use super::ast::{Attribute, Expression, Node, NodeKind, Query, QueryErrors, Value};
use super::visitor::QueryVisitor;

/// Validating visitor; collects messages instead of failing.
pub struct Validator<'a> {
    schema: &'a Schema,
    valid: bool,
    errors: QueryErrors,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            valid: true,
            errors: QueryErrors::new(),
        }
    }

    /// Visit every node of `query`; true when nothing failed.
    pub fn validate(&mut self, query: &Query) -> bool {
        for expression in query.expressions() {
            self.check_expression(expression);
        }
        self.valid
    }

    #[must_use]
    pub fn into_errors(self) -> QueryErrors {
        self.errors
    }

    fn check_expression(&mut self, expression: &Expression) {
        let container = expression.kind();
        match expression {
            Expression::Where(node) | Expression::Filter(node) => self.check_node(node),
            Expression::Select(attributes) => {
                for attribute in attributes {
                    self.check_attribute(attribute, container);
                }
            }
            Expression::Order(orderings) => {
                for ordering in orderings {
                    self.check_attribute(ordering.attribute(), ordering.kind());
                }
            }
            // No attribute to type these against
            Expression::Limit(_) | Expression::Offset(_) | Expression::ScrollCursor(_) => {}
        }
    }

    fn check_node(&mut self, node: &Node) {
        let container = node.kind();
        match node {
            Node::Compare { attribute, value, .. } => {
                if self.check_attribute(attribute, container) {
                    self.check_value(value, attribute, container);
                }
            }
            Node::Between {
                attribute, low, high, ..
            } => {
                if self.check_attribute(attribute, container) {
                    self.check_value(low, attribute, container);
                    self.check_value(high, attribute, container);
                }
            }
            Node::Not(inner) => self.check_node(inner),
            Node::And(nodes) | Node::Or(nodes) => {
                for node in nodes {
                    self.check_node(node);
                }
            }
        }
    }

    fn check_attribute(&mut self, attribute: &Attribute, container: NodeKind) -> bool {
        if attribute.is_wildcard() || attribute.is_score() {
            return true;
        }
        if self.schema.resolve(attribute.name()).is_some() {
            return true;
        }
        self.fail(
            NodeKind::Attribute,
            format!(
                "Attribute '{}' in {} missing from schema",
                attribute.name(),
                container
            ),
        );
        false
    }

    fn check_value(&mut self, value: &Value, attribute: &Attribute, container: NodeKind) {
        let declared = match self.schema.resolve(attribute.name()) {
            Some(SchemaEntry::Field(field_type)) => {
                if field_type.kind().accepts(value.literal()) {
                    return;
                }
                field_type.kind().as_str()
            }
            Some(SchemaEntry::Nested(_)) => "struct",
            // Wildcard, score, or already reported as missing
            None => return,
        };
        self.fail(
            NodeKind::Value,
            format!(
                "Value {} for {} in {} is defined as {} type in schema",
                value.literal(),
                attribute.name(),
                container,
                declared
            ),
        );
    }

    fn fail(&mut self, kind: NodeKind, message: String) {
        self.valid = false;
        self.errors.push(kind, message);
    }
}

impl QueryVisitor for Validator<'_> {
    type Output = bool;
    type Fragment = ();

    fn visit_query(&mut self, query: &Query) -> Result<bool> {
        Ok(self.validate(query))
    }

    fn visit_expression(&mut self, expression: &Expression) -> Result<()> {
        self.check_expression(expression);
        Ok(())
    }

    fn visit_node(&mut self, node: &Node) -> Result<()> {
        self.check_node(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Backend, FieldType, SearchIndex};
    use crate::search::{Direction, QueryBuilder};
    use std::sync::Arc;

    fn index() -> Arc<SearchIndex> {
        Arc::new(SearchIndex::new(
            "things",
            Backend::CloudSearch,
            Schema::new()
                .field("an_integer", FieldType::integer())
                .field("a_string", FieldType::string())
                .field("a_date", FieldType::date())
                .nested("author", Schema::new().field("name", FieldType::string())),
        ))
    }

    #[test]
    fn test_missing_attribute_invalidates_query() {
        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::equal("missing_field", 1))
            .build();

        assert!(!query.validate());
        assert_eq!(
            query.errors().get(NodeKind::Attribute),
            ["Attribute 'missing_field' in Equal missing from schema".to_string()]
        );
    }

    #[test]
    fn test_value_type_mismatch() {
        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::equal("an_integer", "ten"))
            .build();

        assert!(!query.validate());
        assert_eq!(
            query.errors().get(NodeKind::Value),
            ["Value \"ten\" for an_integer in Equal is defined as integer type in schema".to_string()]
        );
    }

    #[test]
    fn test_valid_query() {
        let mut query = QueryBuilder::new(index())
            .where_criteria(
                Node::equal("an_integer", 10)
                    .and(Node::not_equal("a_string", "value"))
                    .and(Node::greater_equal_and_less("a_date", "2020-01-01T00:00:00Z", "2021-01-01T00:00:00Z")),
            )
            .select(["an_integer", "author.name"])
            .order("_score", Direction::Desc)
            .limit(10)
            .build();

        assert!(query.validate());
        assert!(query.errors().is_empty());
        assert!(query.ensure_valid().is_ok());
    }

    #[test]
    fn test_wildcard_and_free_text_values_always_valid() {
        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::free_text("*", 42))
            .build();
        assert!(query.validate());
    }

    #[test]
    fn test_nested_errors_in_select_and_order() {
        let mut query = QueryBuilder::new(index())
            .select(["author.email"])
            .order("missing", Direction::Asc)
            .build();

        assert!(!query.validate());
        assert_eq!(
            query.errors().get(NodeKind::Attribute),
            [
                "Attribute 'author.email' in Select missing from schema".to_string(),
                "Attribute 'missing' in Ascending missing from schema".to_string(),
            ]
        );
    }

    #[test]
    fn test_struct_path_rejects_values() {
        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::equal("author", "Ann"))
            .build();
        assert!(!query.validate());
        assert_eq!(query.errors().get(NodeKind::Value).len(), 1);
    }

    #[test]
    fn test_ensure_valid_exposes_errors() {
        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::less("nope", 3))
            .build();
        match query.ensure_valid() {
            Err(crate::error::SearchError::InvalidQuery { errors }) => {
                assert_eq!(errors.get(NodeKind::Attribute).len(), 1);
            }
            other => panic!("Expected InvalidQuery, got {other:?}"),
        }
    }

    #[test]
    fn test_revalidation_replaces_errors() {
        let mut query = QueryBuilder::new(index())
            .where_criteria(Node::less("nope", 3))
            .build();
        assert!(!query.validate());
        assert!(!query.validate());
        assert_eq!(query.errors().len(), 1);
    }
}
