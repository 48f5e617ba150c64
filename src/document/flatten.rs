// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Flattening between nested documents and single-level field maps.
//!
//! Search engines index flat field names, so nesting is encoded into the key
//! with [`DELIMITER`]: `{"a": {"b": {"c": "x"}}}` becomes `{"a__b__c": "x"}`.
//! Query attributes use dots for the same paths; [`field_name`] maps one to
//! the other so compiled queries line up with indexed fields.

use serde_json::{Map, Value};

/// Separator joining nested keys into one indexed field name.
pub const DELIMITER: &str = "__";

/// Flatten nested objects into delimiter-joined keys.
///
/// Arrays are leaves: their elements are never flattened.
///
/// [`unflatten`] reverses this only for keys that neither contain the
/// delimiter nor start or end with `_` at a nesting boundary:
/// `{"a_": {"b": 1}}` flattens to `a___b`, which reads back as
/// `{"a": {"_b": 1}}`.
#[must_use]
pub fn flatten(document: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, document);
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, prefix: Option<&str>, document: &Map<String, Value>) {
    for (key, value) in document {
        let name = match prefix {
            Some(prefix) => format!("{prefix}{DELIMITER}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(flat, Some(&name), nested),
            other => {
                flat.insert(name, other.clone());
            }
        }
    }
}

/// Rebuild the nested structure encoded by [`flatten`].
///
/// When a key is both a leaf and a prefix of deeper keys, the nested
/// object wins.
#[must_use]
pub fn unflatten(flat: &Map<String, Value>) -> Map<String, Value> {
    let mut root = Map::new();
    for (key, value) in flat {
        let parts: Vec<&str> = key.split(DELIMITER).collect();
        insert_path(&mut root, &parts, value.clone());
    }
    root
}

fn insert_path(node: &mut Map<String, Value>, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [leaf] => {
            match node.get(*leaf) {
                Some(Value::Object(_)) => {}
                _ => {
                    node.insert((*leaf).to_string(), value);
                }
            }
        }
        [head, rest @ ..] => {
            let child = node
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Indexed field name for a dot-separated attribute path (`a.b` -> `a__b`).
#[must_use]
pub fn field_name(path: &str) -> String {
    path.replace('.', DELIMITER)
}
