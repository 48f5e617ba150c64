// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Elasticsearch Translator
//!
//! Compiles the query AST into an Elasticsearch search body. Every
//! expression yields a JSON fragment; the request is their deep merge.
//!
//! ```text
//! Equal        {"term":{"f":v}}
//! NotEqual     {"must_not":{"term":{"f":v}}}
//! Greater..    {"range":{"f":{"gt":v}}}
//! Contains     {"wildcard":{"f":"*v*"}}
//! Starts       {"wildcard":{"f":"v*"}}
//! FreeText     {"query_string":{"query":v,"default_field":"f"}}
//! Fuzzy        {"fuzzy":{"f":v}}
//! And/Or/Not   {"bool":{"must"|"should"|"must_not":[...]}}
//! Where        {"query":...}       Filter  {"post_filter":...}
//! Select       {"fields":[...]}    Order   {"sort":[{"f":{"order":"asc"}}]}
//! Limit        {"size":n}          Offset  {"from":n}
//! ScrollCursor {"scroll":"1m","scroll_id":c}
//! ```

use serde_json::{json, Map, Value as Json};

use crate::error::{Result, SearchError};
use crate::schema::Schema;

use super::ast::{Attribute, Comparison, Expression, Node, NodeKind, Ordering, Query, Value};
use super::visitor::QueryVisitor;

const BACKEND: &str = "elasticsearch";

/// Default scroll context lifetime.
pub const DEFAULT_SCROLL_KEEP_ALIVE: &str = "1m";

/// Elasticsearch query translator
#[derive(Debug, Clone)]
pub struct ElasticsearchTranslator<'a> {
    schema: &'a Schema,
    scroll_keep_alive: String,
}

impl<'a> ElasticsearchTranslator<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            scroll_keep_alive: DEFAULT_SCROLL_KEEP_ALIVE.to_string(),
        }
    }

    /// Scroll lifetime sent with scroll cursors
    #[must_use]
    pub fn with_scroll_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.scroll_keep_alive = keep_alive.into();
        self
    }

    /// Translate a query against its own index schema
    pub fn translate(query: &Query) -> Result<Json> {
        ElasticsearchTranslator::new(&query.index().schema).visit_query(query)
    }

    /// Compile a single criterion
    pub fn translate_node(&self, node: &Node) -> Result<Json> {
        match node {
            Node::Compare { op, attribute, value } => self.translate_compare(*op, attribute, value),
            Node::Between {
                op,
                attribute,
                low,
                high,
            } => {
                let field = concrete_field(attribute, op.kind())?;
                let lower = if op.lower_inclusive() { "gte" } else { "gt" };
                let upper = if op.upper_inclusive() { "lte" } else { "lt" };
                Ok(json!({"range": {field: {
                    lower: self.literal(attribute, low),
                    upper: self.literal(attribute, high),
                }}}))
            }
            Node::Not(inner) => Ok(json!({"bool": {"must_not": [self.translate_node(inner)?]}})),
            Node::And(nodes) => Ok(json!({"bool": {"must": self.translate_all(nodes)?}})),
            Node::Or(nodes) => Ok(json!({"bool": {"should": self.translate_all(nodes)?}})),
        }
    }

    fn translate_all(&self, nodes: &[Node]) -> Result<Vec<Json>> {
        nodes.iter().map(|node| self.translate_node(node)).collect()
    }

    fn translate_compare(&self, op: Comparison, attribute: &Attribute, value: &Value) -> Result<Json> {
        let kind = op.kind();
        match op {
            Comparison::FreeText => {
                let mut query_string = Map::new();
                query_string.insert("query".into(), self.literal(attribute, value));
                if !attribute.is_wildcard() {
                    query_string.insert("default_field".into(), Json::String(attribute.field_name()));
                }
                Ok(json!({"query_string": query_string}))
            }
            Comparison::Equal => {
                let field = concrete_field(attribute, kind)?;
                Ok(json!({"term": {field: self.literal(attribute, value)}}))
            }
            Comparison::NotEqual => {
                let field = concrete_field(attribute, kind)?;
                Ok(json!({"must_not": {"term": {field: self.literal(attribute, value)}}}))
            }
            Comparison::Greater | Comparison::GreaterEqual | Comparison::Less | Comparison::LessEqual => {
                let field = concrete_field(attribute, kind)?;
                let bound = match op {
                    Comparison::Greater => "gt",
                    Comparison::GreaterEqual => "gte",
                    Comparison::Less => "lt",
                    _ => "lte",
                };
                Ok(json!({"range": {field: {bound: self.literal(attribute, value)}}}))
            }
            Comparison::Contains | Comparison::Starts => {
                let field = concrete_field(attribute, kind)?;
                let term = self.value(attribute, value).as_term().ok_or(SearchError::UnsupportedNode {
                    backend: BACKEND,
                    node: NodeKind::Value,
                })?;
                let pattern = if op == Comparison::Contains {
                    format!("*{term}*")
                } else {
                    format!("{term}*")
                };
                Ok(json!({"wildcard": {field: pattern}}))
            }
            Comparison::Fuzzy => {
                let field = concrete_field(attribute, kind)?;
                Ok(json!({"fuzzy": {field: self.literal(attribute, value)}}))
            }
        }
    }

    /// Value as compiled for the attribute's declared field type
    fn value(&self, attribute: &Attribute, value: &Value) -> Value {
        let declared = self.schema.field_type(attribute.name()).map(|t| t.kind());
        value.for_kind(declared)
    }

    fn literal(&self, attribute: &Attribute, value: &Value) -> Json {
        self.value(attribute, value).literal().to_json()
    }
}

impl QueryVisitor for ElasticsearchTranslator<'_> {
    type Output = Json;
    type Fragment = Json;

    fn visit_query(&mut self, query: &Query) -> Result<Json> {
        let mut body = Json::Object(Map::new());
        for expression in query.expressions() {
            let fragment = self.visit_expression(expression)?;
            deep_merge(&mut body, fragment);
        }
        Ok(body)
    }

    fn visit_expression(&mut self, expression: &Expression) -> Result<Json> {
        match expression {
            Expression::Where(node) => Ok(json!({"query": self.visit_node(node)?})),
            Expression::Filter(node) => Ok(json!({"post_filter": self.visit_node(node)?})),
            Expression::Select(attributes) => {
                let fields: Vec<String> = attributes.iter().map(Attribute::field_name).collect();
                Ok(json!({"fields": fields}))
            }
            Expression::Order(orderings) => {
                let sort: Vec<Json> = orderings
                    .iter()
                    .map(|ordering| {
                        let direction = match ordering {
                            Ordering::Ascending(_) => "asc",
                            Ordering::Descending(_) => "desc",
                        };
                        json!({ordering.attribute().field_name(): {"order": direction}})
                    })
                    .collect();
                Ok(json!({"sort": sort}))
            }
            Expression::Limit(value) => Ok(json!({"size": count(value, NodeKind::Limit)?})),
            Expression::Offset(value) => Ok(json!({"from": count(value, NodeKind::Offset)?})),
            Expression::ScrollCursor(value) => Ok(json!({
                "scroll": self.scroll_keep_alive,
                "scroll_id": value.literal().to_json(),
            })),
        }
    }

    fn visit_node(&mut self, node: &Node) -> Result<Json> {
        self.translate_node(node)
    }
}

fn concrete_field(attribute: &Attribute, kind: NodeKind) -> Result<String> {
    if attribute.is_wildcard() {
        return Err(SearchError::UnsupportedAttribute {
            backend: BACKEND,
            node: kind,
            attribute: attribute.name().to_string(),
        });
    }
    Ok(attribute.field_name())
}

fn count(value: &Value, kind: NodeKind) -> Result<u64> {
    value.as_count().ok_or(SearchError::UnsupportedNode {
        backend: BACKEND,
        node: kind,
    })
}

/// Merge `fragment` into `target`; objects merge key by key, anything else
/// is replaced.
pub fn deep_merge(target: &mut Json, fragment: Json) {
    match (target, fragment) {
        (Json::Object(target), Json::Object(fragment)) => {
            for (key, value) in fragment {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, fragment) => *target = fragment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Backend, FieldType, SearchIndex};
    use crate::search::{Direction, QueryBuilder};
    use std::sync::Arc;

    fn schema() -> Schema {
        Schema::new()
            .field("an_integer", FieldType::integer())
            .field("a_string", FieldType::string())
            .field("a_date", FieldType::date())
            .nested("author", Schema::new().field("name", FieldType::string()))
    }

    fn index() -> Arc<SearchIndex> {
        Arc::new(SearchIndex::new("things", Backend::Elasticsearch, schema()))
    }

    fn node(node: &Node) -> Json {
        let schema = schema();
        ElasticsearchTranslator::new(&schema).translate_node(node).unwrap()
    }

    #[test]
    fn test_greater() {
        assert_eq!(
            node(&Node::greater("an_integer", 10)),
            json!({"range": {"an_integer": {"gt": 10}}})
        );
    }

    #[test]
    fn test_or_of_three() {
        let a = Node::equal("a_string", "a");
        let b = Node::equal("a_string", "b");
        let c = Node::less_equal("an_integer", 3);
        assert_eq!(
            node(&Node::Or(vec![a.clone(), b.clone(), c.clone()])),
            json!({"bool": {"should": [node(&a), node(&b), node(&c)]}})
        );
    }

    #[test]
    fn test_term_and_not_equal() {
        assert_eq!(
            node(&Node::equal("author.name", "Ann")),
            json!({"term": {"author__name": "Ann"}})
        );
        assert_eq!(
            node(&Node::not_equal("a_string", "x")),
            json!({"must_not": {"term": {"a_string": "x"}}})
        );
    }

    #[test]
    fn test_between_and_boolean_operations() {
        assert_eq!(
            node(&Node::greater_equal_and_less("an_integer", 1, 5)),
            json!({"range": {"an_integer": {"gte": 1, "lt": 5}}})
        );
        assert_eq!(
            node(&Node::equal("an_integer", 1).and(Node::equal("a_string", "x").negate())),
            json!({"bool": {"must": [
                {"term": {"an_integer": 1}},
                {"bool": {"must_not": [{"term": {"a_string": "x"}}]}}
            ]}})
        );
    }

    #[test]
    fn test_wildcards_free_text_and_fuzzy() {
        assert_eq!(
            node(&Node::contains("a_string", "mid")),
            json!({"wildcard": {"a_string": "*mid*"}})
        );
        assert_eq!(
            node(&Node::starts("a_string", "pre")),
            json!({"wildcard": {"a_string": "pre*"}})
        );
        assert_eq!(
            node(&Node::free_text("*", "star wars")),
            json!({"query_string": {"query": "star wars"}})
        );
        assert_eq!(
            node(&Node::free_text("a_string", "star")),
            json!({"query_string": {"query": "star", "default_field": "a_string"}})
        );
        assert_eq!(node(&Node::fuzzy("a_string", "stra")), json!({"fuzzy": {"a_string": "stra"}}));
    }

    #[test]
    fn test_rfc3339_text_on_date_field_is_normalized() {
        assert_eq!(
            node(&Node::greater("a_date", "2020-01-01T05:00:00.123+02:00")),
            json!({"range": {"a_date": {"gt": "2020-01-01T03:00:00Z"}}})
        );
        assert_eq!(
            node(&Node::greater_and_less_equal(
                "a_date",
                "2019-12-31T22:00:00-03:00",
                "2020-01-02T00:00:00.5Z"
            )),
            json!({"range": {"a_date": {"gt": "2020-01-01T01:00:00Z", "lte": "2020-01-02T00:00:00Z"}}})
        );
        assert_eq!(
            node(&Node::equal("a_string", "2020-01-01T05:00:00+02:00")),
            json!({"term": {"a_string": "2020-01-01T05:00:00+02:00"}})
        );
    }

    #[test]
    fn test_wildcard_attribute_needs_free_text() {
        let schema = schema();
        assert!(matches!(
            ElasticsearchTranslator::new(&schema).translate_node(&Node::equal("*", "x")),
            Err(SearchError::UnsupportedAttribute { node: NodeKind::Equal, .. })
        ));
    }

    #[test]
    fn test_full_body_is_deep_merge() {
        let query = QueryBuilder::new(index())
            .where_criteria(Node::equal("a_string", "value"))
            .select(["a_string", "author.name"])
            .order("an_integer", Direction::Desc)
            .limit(10)
            .offset(5)
            .filter(Node::greater("an_integer", 1))
            .scroll_cursor("abc")
            .build();

        assert_eq!(
            ElasticsearchTranslator::translate(&query).unwrap(),
            json!({
                "query": {"term": {"a_string": "value"}},
                "fields": ["a_string", "author__name"],
                "sort": [{"an_integer": {"order": "desc"}}],
                "size": 10,
                "from": 5,
                "post_filter": {"range": {"an_integer": {"gt": 1}}},
                "scroll": "1m",
                "scroll_id": "abc"
            })
        );
    }

    #[test]
    fn test_empty_query_is_empty_body() {
        let query = QueryBuilder::new(index()).build();
        assert_eq!(ElasticsearchTranslator::translate(&query).unwrap(), json!({}));
    }

    #[test]
    fn test_scroll_keep_alive_override() {
        let query = QueryBuilder::new(index()).scroll_cursor("abc").build();
        let schema = schema();
        let body = ElasticsearchTranslator::new(&schema)
            .with_scroll_keep_alive("5m")
            .visit_query(&query)
            .unwrap();
        assert_eq!(body, json!({"scroll": "5m", "scroll_id": "abc"}));
    }

    #[test]
    fn test_deep_merge() {
        let mut target = json!({"a": {"b": 1}, "c": [1]});
        deep_merge(&mut target, json!({"a": {"d": 2}, "c": [2]}));
        assert_eq!(target, json!({"a": {"b": 1, "d": 2}, "c": [2]}));
    }
}
