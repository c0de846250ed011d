//! Shape canonicalizer
//!
//! Replaces every scalar leaf of a document with the sentinel `1` so that
//! only key names, nesting and array lengths survive. Regular expression
//! leaves are kept intact: their options distinguish otherwise identical
//! shapes and are rendered later by the pattern passes.

use serde_json::Value;
use slowop_format::constants::{PATTERN_EMPTY, REGEX_WRAPPER_KEY, SENTINEL};
use slowop_format::Document;

/// True for an extended JSON `{"$regularExpression": {...}}` wrapper.
pub fn is_regex_wrapper(map: &Document) -> bool {
    map.len() == 1 && matches!(map.get(REGEX_WRAPPER_KEY), Some(Value::Object(_)))
}

/// Structurally isomorphic copy of `value` with scalar leaves collapsed.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) if is_regex_wrapper(map) => value.clone(),
        Value::Object(map) => Value::Object(canonicalize_document(map)),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Value::from(SENTINEL),
    }
}

/// Canonicalize every value of a document, keeping its keys.
pub fn canonicalize_document(document: &Document) -> Document {
    document
        .iter()
        .map(|(key, value)| (key.clone(), canonicalize(value)))
        .collect()
}

/// True when a regex wrapper appears anywhere inside `value`.
pub fn contains_regex(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            is_regex_wrapper(map) || map.values().any(contains_regex)
        }
        Value::Array(items) => items.iter().any(contains_regex),
        _ => false,
    }
}

/// True when any object inside `value` has a key starting with one of
/// `prefixes`.
pub fn contains_key_with_prefix(value: &Value, prefixes: &[&str]) -> bool {
    match value {
        Value::Object(map) => {
            map.keys()
                .any(|key| prefixes.iter().any(|prefix| key.starts_with(prefix)))
                || map
                    .values()
                    .any(|inner| contains_key_with_prefix(inner, prefixes))
        }
        Value::Array(items) => items
            .iter()
            .any(|inner| contains_key_with_prefix(inner, prefixes)),
        _ => false,
    }
}

/// Compact serialization with sorted keys, `{}` if serialization fails.
pub fn to_compact_string(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| PATTERN_EMPTY.to_string())
}
