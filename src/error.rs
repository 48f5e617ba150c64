// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types shared by every subsystem.
//!
//! Validation problems are not errors until the caller asks for them: they
//! accumulate in a [`QueryErrors`] map on the query and only surface as
//! [`SearchError::InvalidQuery`] when the query is executed.

use thiserror::Error;

use crate::search::{NodeKind, QueryErrors};

/// Failure reported by an externally supplied search client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Rate limiting or another transient rejection. The only kind retried.
    #[error("Backend throttled the request: {0}")]
    Throttled(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ClientError {
    /// Whether the retry loop may try the call again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Throttled(_))
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Query failed schema validation: {errors}")]
    InvalidQuery { errors: QueryErrors },

    #[error("Circular reference detected while extracting '{identity}'")]
    CircularReference { identity: String },

    #[error("{backend} cannot compile {node} nodes")]
    UnsupportedNode { backend: &'static str, node: NodeKind },

    #[error("{backend} cannot compile {node} on attribute '{attribute}'")]
    UnsupportedAttribute {
        backend: &'static str,
        node: NodeKind,
        attribute: String,
    },

    #[error("Indexing error: {0}")]
    Indexing(String),

    #[error("Document of {size} bytes exceeds the {max} byte payload limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Invalid field definition: {0}")]
    InvalidField(String),

    #[error("Unknown index '{0}'")]
    UnknownIndex(String),

    #[error("No content defined for type '{type_name}' on index '{index}'")]
    UnknownContent { type_name: String, index: String },

    #[error("Index '{index}' belongs to {expected}, not {actual}")]
    IncompatibleBackend {
        index: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Query for index '{query}' cannot run on index '{bound}'")]
    IndexMismatch { query: String, bound: String },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Whether the error came from a transient backend rejection.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Client(err) if err.is_transient())
    }
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_throttling_is_transient() {
        assert!(ClientError::Throttled("slow down".into()).is_transient());
        assert!(!ClientError::Transport("reset".into()).is_transient());
        assert!(!ClientError::Rejected {
            status: 400,
            message: "bad".into()
        }
        .is_transient());

        let wrapped: SearchError = ClientError::Throttled("x".into()).into();
        assert!(wrapped.is_transient());
        assert!(!SearchError::Indexing("no id".into()).is_transient());
    }

    #[test]
    fn test_unsupported_messages_are_distinct() {
        let node = SearchError::UnsupportedNode {
            backend: "cloudsearch-simple",
            node: NodeKind::And,
        };
        let attribute = SearchError::UnsupportedAttribute {
            backend: "cloudsearch-simple",
            node: NodeKind::Equal,
            attribute: "title".into(),
        };
        assert_eq!(node.to_string(), "cloudsearch-simple cannot compile And nodes");
        assert_eq!(
            attribute.to_string(),
            "cloudsearch-simple cannot compile Equal on attribute 'title'"
        );
    }
}
