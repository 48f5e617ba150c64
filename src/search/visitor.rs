// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Visitor contract shared by the validator and the backend translators.

use crate::error::Result;

use super::ast::{Expression, Node, Query};

/// A walk over a query AST.
///
/// Implementations match exhaustively on [`Expression`] and [`Node`], so a
/// new node kind fails to compile until every visitor handles it.
pub trait QueryVisitor {
    /// Result of visiting a whole query.
    type Output;
    /// Result of visiting a single expression or node.
    type Fragment;

    fn visit_query(&mut self, query: &Query) -> Result<Self::Output>;

    fn visit_expression(&mut self, expression: &Expression) -> Result<Self::Fragment>;

    fn visit_node(&mut self, node: &Node) -> Result<Self::Fragment>;
}
