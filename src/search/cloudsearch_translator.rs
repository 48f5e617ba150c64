// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! CloudSearch Translator
//!
//! Compiles the query AST into CloudSearch request parameters.
//!
//! # Structured Query Syntax
//!
//! ```text
//! (term field=title 'star')          - Exact match
//! (not term field=title 'star')      - Not equal
//! (range field=year [1990,2000})     - Range, [ ] inclusive, { } exclusive
//! (phrase field=title 'star wars')   - Phrase
//! (prefix field=title 'sta')         - Prefix
//! (and q1 q2) (or q1 q2) (not q)     - Boolean operations
//! ```
//!
//! # Simple Query Syntax
//!
//! Only criteria on the wildcard attribute compile:
//!
//! ```text
//! star        - Term (Equal, FreeText)
//! "star wars" - Phrase (Contains)
//! sta*        - Prefix (Starts)
//! star~1      - Fuzzy
//! ```

use serde::Serialize;

use crate::document::FieldValue;
use crate::error::{Result, SearchError};
use crate::schema::Schema;

use super::ast::{Attribute, Comparison, Expression, Node, NodeKind, Ordering, Query, Value};
use super::visitor::QueryVisitor;

/// CloudSearch query language used for the main query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryParser {
    #[default]
    Structured,
    Simple,
}

impl QueryParser {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryParser::Structured => "structured",
            QueryParser::Simple => "simple",
        }
    }

    /// Name used in unsupported-node errors.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            QueryParser::Structured => "cloudsearch",
            QueryParser::Simple => "cloudsearch-simple",
        }
    }
}

/// Search request parameters; absent parts are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloudSearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "queryParser", skip_serializing_if = "Option::is_none")]
    pub query_parser: Option<String>,
    #[serde(rename = "filterQuery", skip_serializing_if = "Option::is_none")]
    pub filter_query: Option<String>,
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    pub return_fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// CloudSearch query translator
pub struct CloudSearchTranslator<'a> {
    schema: &'a Schema,
    parser: QueryParser,
}

impl<'a> CloudSearchTranslator<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema, parser: QueryParser) -> Self {
        Self { schema, parser }
    }

    /// Translate a query against its own index schema
    pub fn translate(query: &Query, parser: QueryParser) -> Result<CloudSearchRequest> {
        CloudSearchTranslator::new(&query.index().schema, parser).visit_query(query)
    }

    /// Compile a single criterion with this translator's parser
    pub fn translate_node(&self, node: &Node) -> Result<String> {
        match self.parser {
            QueryParser::Structured => self.structured(node),
            QueryParser::Simple => self.simple(node),
        }
    }

    fn structured(&self, node: &Node) -> Result<String> {
        match node {
            Node::Compare { op, attribute, value } => self.structured_compare(*op, attribute, value),
            Node::Between {
                op,
                attribute,
                low,
                high,
            } => {
                let field = self.concrete_field(attribute, op.kind())?;
                Ok(format!(
                    "(range field={} {}{},{}{})",
                    field,
                    if op.lower_inclusive() { '[' } else { '{' },
                    self.quote(attribute, low)?,
                    self.quote(attribute, high)?,
                    if op.upper_inclusive() { ']' } else { '}' },
                ))
            }
            Node::Not(inner) => Ok(format!("(not {})", self.structured(inner)?)),
            Node::And(nodes) => Ok(format!("(and {})", self.structured_all(nodes)?)),
            Node::Or(nodes) => Ok(format!("(or {})", self.structured_all(nodes)?)),
        }
    }

    fn structured_all(&self, nodes: &[Node]) -> Result<String> {
        let parts = nodes
            .iter()
            .map(|node| self.structured(node))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(" "))
    }

    fn structured_compare(&self, op: Comparison, attribute: &Attribute, value: &Value) -> Result<String> {
        let kind = op.kind();
        match op {
            Comparison::Equal => Ok(format!(
                "(term {}{})",
                self.field_prefix(attribute),
                self.quote(attribute, value)?
            )),
            Comparison::NotEqual => Ok(format!(
                "(not term {}{})",
                self.field_prefix(attribute),
                self.quote(attribute, value)?
            )),
            Comparison::Greater => self.open_range(attribute, kind, Some(('{', value)), None),
            Comparison::GreaterEqual => self.open_range(attribute, kind, Some(('[', value)), None),
            Comparison::Less => self.open_range(attribute, kind, None, Some(('}', value))),
            Comparison::LessEqual => self.open_range(attribute, kind, None, Some((']', value))),
            Comparison::Contains | Comparison::FreeText => Ok(format!(
                "(phrase {}{})",
                self.field_prefix(attribute),
                self.quote(attribute, value)?
            )),
            Comparison::Starts => Ok(format!(
                "(prefix {}{})",
                self.field_prefix(attribute),
                self.quote(attribute, value)?
            )),
            Comparison::Fuzzy => Err(self.unsupported(kind)),
        }
    }

    /// Range with one unbounded side; open sides are always exclusive.
    fn open_range(
        &self,
        attribute: &Attribute,
        kind: NodeKind,
        lower: Option<(char, &Value)>,
        upper: Option<(char, &Value)>,
    ) -> Result<String> {
        let field = self.concrete_field(attribute, kind)?;
        let (open, low) = match lower {
            Some((bracket, value)) => (bracket, self.quote(attribute, value)?),
            None => ('{', String::new()),
        };
        let (close, high) = match upper {
            Some((bracket, value)) => (bracket, self.quote(attribute, value)?),
            None => ('}', String::new()),
        };
        Ok(format!("(range field={field} {open}{low},{high}{close})"))
    }

    fn simple(&self, node: &Node) -> Result<String> {
        let Node::Compare { op, attribute, value } = node else {
            return Err(self.unsupported(node.kind()));
        };
        let kind = op.kind();
        if !matches!(
            op,
            Comparison::Equal
                | Comparison::FreeText
                | Comparison::Contains
                | Comparison::Starts
                | Comparison::Fuzzy
        ) {
            return Err(self.unsupported(kind));
        }
        if !attribute.is_wildcard() {
            return Err(SearchError::UnsupportedAttribute {
                backend: self.parser.backend_name(),
                node: kind,
                attribute: attribute.name().to_string(),
            });
        }
        let term = value
            .as_term()
            .ok_or_else(|| self.unsupported(NodeKind::Value))?;
        Ok(match op {
            Comparison::Contains => format!("\"{}\"", term.replace('"', "\\\"")),
            Comparison::Starts => format!("{term}*"),
            Comparison::Fuzzy => format!("{term}~1"),
            _ => term,
        })
    }

    /// `field=<name> ` or nothing for the wildcard
    fn field_prefix(&self, attribute: &Attribute) -> String {
        if attribute.is_wildcard() {
            String::new()
        } else {
            format!("field={} ", attribute.field_name())
        }
    }

    fn concrete_field(&self, attribute: &Attribute, kind: NodeKind) -> Result<String> {
        if attribute.is_wildcard() {
            return Err(SearchError::UnsupportedAttribute {
                backend: self.parser.backend_name(),
                node: kind,
                attribute: attribute.name().to_string(),
            });
        }
        Ok(attribute.field_name())
    }

    /// Render a literal: bare for numeric fields, quoted otherwise. Dates
    /// are quoted in UTC.
    fn quote(&self, attribute: &Attribute, value: &Value) -> Result<String> {
        let declared = self.schema.field_type(attribute.name()).map(|t| t.kind());
        let numeric_field = declared.map_or(true, |kind| kind.is_numeric());
        let value = value.for_kind(declared);
        match value.literal() {
            FieldValue::Integer(_) | FieldValue::Double(_) if numeric_field => value
                .as_term()
                .ok_or_else(|| self.unsupported(NodeKind::Value)),
            _ => {
                let term = value
                    .as_term()
                    .ok_or_else(|| self.unsupported(NodeKind::Value))?;
                Ok(format!("'{}'", escape(&term)))
            }
        }
    }

    fn sort(&self, orderings: &[Ordering]) -> String {
        orderings
            .iter()
            .map(|ordering| match ordering {
                Ordering::Ascending(attribute) => format!("{} asc", attribute.field_name()),
                Ordering::Descending(attribute) => format!("{} desc", attribute.field_name()),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn return_fields(&self, attributes: &[Attribute]) -> String {
        attributes
            .iter()
            .map(|attribute| {
                if attribute.is_wildcard() {
                    "_all_fields".to_string()
                } else {
                    attribute.field_name()
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn count(&self, value: &Value, kind: NodeKind) -> Result<u64> {
        value.as_count().ok_or_else(|| self.unsupported(kind))
    }

    fn unsupported(&self, node: NodeKind) -> SearchError {
        SearchError::UnsupportedNode {
            backend: self.parser.backend_name(),
            node,
        }
    }
}

impl QueryVisitor for CloudSearchTranslator<'_> {
    type Output = CloudSearchRequest;
    type Fragment = String;

    fn visit_query(&mut self, query: &Query) -> Result<CloudSearchRequest> {
        let mut request = CloudSearchRequest::default();
        for expression in query.expressions() {
            match expression {
                Expression::Where(_) => {
                    request.query = Some(self.visit_expression(expression)?);
                    request.query_parser = Some(self.parser.as_str().to_string());
                }
                Expression::Filter(_) => request.filter_query = Some(self.visit_expression(expression)?),
                Expression::Select(_) => request.return_fields = Some(self.visit_expression(expression)?),
                Expression::Order(_) => request.sort = Some(self.visit_expression(expression)?),
                Expression::Limit(value) => request.size = Some(self.count(value, NodeKind::Limit)?),
                Expression::Offset(value) => request.start = Some(self.count(value, NodeKind::Offset)?),
                Expression::ScrollCursor(_) => request.cursor = Some(self.visit_expression(expression)?),
            }
        }
        Ok(request)
    }

    fn visit_expression(&mut self, expression: &Expression) -> Result<String> {
        match expression {
            Expression::Where(node) => self.visit_node(node),
            // Filter queries only accept the structured syntax
            Expression::Filter(node) => self.structured(node),
            Expression::Select(attributes) => Ok(self.return_fields(attributes)),
            Expression::Order(orderings) => Ok(self.sort(orderings)),
            Expression::Limit(value) => Ok(self.count(value, NodeKind::Limit)?.to_string()),
            Expression::Offset(value) => Ok(self.count(value, NodeKind::Offset)?.to_string()),
            Expression::ScrollCursor(value) => match value.literal() {
                FieldValue::Text(cursor) => Ok(cursor.clone()),
                _ => Err(self.unsupported(NodeKind::ScrollCursor)),
            },
        }
    }

    fn visit_node(&mut self, node: &Node) -> Result<String> {
        self.translate_node(node)
    }
}

fn escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if c == '\'' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Backend, FieldType, SearchIndex};
    use crate::search::{Direction, QueryBuilder};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn schema() -> Schema {
        Schema::new()
            .field("an_integer", FieldType::integer())
            .field("a_double", FieldType::double())
            .field("a_string", FieldType::string())
            .field("a_date", FieldType::date())
            .field("a_bool", FieldType::boolean())
            .nested("author", Schema::new().field("name", FieldType::string()))
    }

    fn index() -> Arc<SearchIndex> {
        Arc::new(SearchIndex::new("things", Backend::CloudSearch, schema()))
    }

    fn structured(node: &Node) -> Result<String> {
        let schema = schema();
        CloudSearchTranslator::new(&schema, QueryParser::Structured).translate_node(node)
    }

    fn simple(node: &Node) -> Result<String> {
        let schema = schema();
        CloudSearchTranslator::new(&schema, QueryParser::Simple).translate_node(node)
    }

    #[test]
    fn test_equal() {
        assert_eq!(
            structured(&Node::equal("a_string", "value")).unwrap(),
            "(term field=a_string 'value')"
        );
    }

    #[test]
    fn test_and_with_not_equal() {
        let node = Node::equal("an_integer", 10).and(Node::not_equal("a_string", "value"));
        assert_eq!(
            structured(&node).unwrap(),
            "(and (term field=an_integer 10) (not term field=a_string 'value'))"
        );
    }

    #[test]
    fn test_or_and_not() {
        let node = Node::Or(vec![
            Node::equal("an_integer", 1),
            Node::equal("an_integer", 2),
            Node::equal("an_integer", 3).negate(),
        ]);
        assert_eq!(
            structured(&node).unwrap(),
            "(or (term field=an_integer 1) (term field=an_integer 2) (not (term field=an_integer 3)))"
        );
    }

    #[test]
    fn test_open_ranges() {
        assert_eq!(
            structured(&Node::greater("an_integer", 10)).unwrap(),
            "(range field=an_integer {10,})"
        );
        assert_eq!(
            structured(&Node::greater_equal("an_integer", 10)).unwrap(),
            "(range field=an_integer [10,})"
        );
        assert_eq!(
            structured(&Node::less("a_double", 2.5)).unwrap(),
            "(range field=a_double {,2.5})"
        );
        assert_eq!(
            structured(&Node::less_equal("an_integer", 10)).unwrap(),
            "(range field=an_integer {,10])"
        );
    }

    #[test]
    fn test_between_brackets() {
        assert_eq!(
            structured(&Node::greater_and_less("an_integer", 1, 5)).unwrap(),
            "(range field=an_integer {1,5})"
        );
        assert_eq!(
            structured(&Node::greater_equal_and_less("an_integer", 1, 5)).unwrap(),
            "(range field=an_integer [1,5})"
        );
        assert_eq!(
            structured(&Node::greater_and_less_equal("an_integer", 1, 5)).unwrap(),
            "(range field=an_integer {1,5])"
        );
        assert_eq!(
            structured(&Node::greater_equal_and_less_equal("an_integer", 1, 5)).unwrap(),
            "(range field=an_integer [1,5])"
        );
    }

    #[test]
    fn test_dates_are_quoted_utc() {
        let from = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            structured(&Node::greater_equal("a_date", from)).unwrap(),
            "(range field=a_date ['2020-01-02T03:04:05Z',})"
        );
    }

    #[test]
    fn test_rfc3339_text_on_date_field_is_normalized() {
        assert_eq!(
            structured(&Node::greater("a_date", "2020-01-01T05:00:00.123+02:00")).unwrap(),
            "(range field=a_date {'2020-01-01T03:00:00Z',})"
        );
        assert_eq!(
            structured(&Node::greater_equal_and_less(
                "a_date",
                "2020-01-01T00:00:00-05:00",
                "2020-01-02T00:00:00.999Z"
            ))
            .unwrap(),
            "(range field=a_date ['2020-01-01T05:00:00Z','2020-01-02T00:00:00Z'})"
        );
        // Not a date field: left as written
        assert_eq!(
            structured(&Node::equal("a_string", "2020-01-01T05:00:00+02:00")).unwrap(),
            "(term field=a_string '2020-01-01T05:00:00+02:00')"
        );
    }

    #[test]
    fn test_quoting_follows_field_type() {
        assert_eq!(
            structured(&Node::equal("a_string", 10)).unwrap(),
            "(term field=a_string '10')"
        );
        assert_eq!(
            structured(&Node::equal("a_bool", true)).unwrap(),
            "(term field=a_bool 'true')"
        );
        assert_eq!(
            structured(&Node::equal("a_string", "it's")).unwrap(),
            "(term field=a_string 'it\\'s')"
        );
    }

    #[test]
    fn test_phrase_prefix_and_nested_names() {
        assert_eq!(
            structured(&Node::contains("author.name", "jane doe")).unwrap(),
            "(phrase field=author__name 'jane doe')"
        );
        assert_eq!(
            structured(&Node::starts("author.name", "ja")).unwrap(),
            "(prefix field=author__name 'ja')"
        );
        assert_eq!(structured(&Node::free_text("*", "star wars")).unwrap(), "(phrase 'star wars')");
    }

    #[test]
    fn test_structured_rejects_fuzzy_and_wildcard_ranges() {
        assert!(matches!(
            structured(&Node::fuzzy("a_string", "x")),
            Err(SearchError::UnsupportedNode { node: NodeKind::Fuzzy, .. })
        ));
        assert!(matches!(
            structured(&Node::greater("*", 1)),
            Err(SearchError::UnsupportedAttribute { node: NodeKind::Greater, .. })
        ));
    }

    #[test]
    fn test_simple_parser_terms() {
        assert_eq!(simple(&Node::equal("*", "star")).unwrap(), "star");
        assert_eq!(simple(&Node::free_text("*", "star")).unwrap(), "star");
        assert_eq!(simple(&Node::starts("*", "sta")).unwrap(), "sta*");
        assert_eq!(simple(&Node::fuzzy("*", "stra")).unwrap(), "stra~1");
        assert_eq!(simple(&Node::contains("*", "star wars")).unwrap(), "\"star wars\"");
    }

    #[test]
    fn test_simple_parser_failures_are_distinct() {
        assert!(matches!(
            simple(&Node::equal("*", "a").and(Node::equal("*", "b"))),
            Err(SearchError::UnsupportedNode { backend: "cloudsearch-simple", node: NodeKind::And })
        ));
        assert!(matches!(
            simple(&Node::greater_and_less("*", 1, 2)),
            Err(SearchError::UnsupportedNode { node: NodeKind::GreaterAndLess, .. })
        ));
        assert!(matches!(
            simple(&Node::greater("*", 1)),
            Err(SearchError::UnsupportedNode { node: NodeKind::Greater, .. })
        ));
        match simple(&Node::equal("a_string", "x")) {
            Err(SearchError::UnsupportedAttribute { node, attribute, .. }) => {
                assert_eq!(node, NodeKind::Equal);
                assert_eq!(attribute, "a_string");
            }
            other => panic!("Expected UnsupportedAttribute, got {other:?}"),
        }
    }

    #[test]
    fn test_full_request() {
        let query = QueryBuilder::new(index())
            .where_criteria(Node::equal("a_string", "value"))
            .select(["a_string", "author.name"])
            .order("an_integer", Direction::Asc)
            .order("_score", Direction::Desc)
            .limit(10)
            .offset(20)
            .filter(Node::greater("an_integer", 1))
            .build();

        let request = CloudSearchTranslator::translate(&query, QueryParser::Structured).unwrap();
        assert_eq!(
            request,
            CloudSearchRequest {
                query: Some("(term field=a_string 'value')".into()),
                query_parser: Some("structured".into()),
                filter_query: Some("(range field=an_integer {1,})".into()),
                return_fields: Some("a_string,author__name".into()),
                sort: Some("an_integer asc,_score desc".into()),
                size: Some(10),
                start: Some(20),
                cursor: None,
            }
        );
    }

    #[test]
    fn test_unconfigured_parts_are_omitted() {
        let query = QueryBuilder::new(index()).scroll_cursor("initial").build();
        let request = CloudSearchTranslator::translate(&query, QueryParser::Simple).unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"cursor": "initial"})
        );
    }

    #[test]
    fn test_filter_is_structured_under_simple_parser() {
        let query = QueryBuilder::new(index())
            .where_criteria(Node::free_text("*", "star"))
            .filter(Node::equal("a_string", "x"))
            .build();
        let request = CloudSearchTranslator::translate(&query, QueryParser::Simple).unwrap();
        assert_eq!(request.query.as_deref(), Some("star"));
        assert_eq!(request.query_parser.as_deref(), Some("simple"));
        assert_eq!(request.filter_query.as_deref(), Some("(term field=a_string 'x')"));
    }
}
