//! Field trees and payload sanitization
//!
//! Resource fields are dynamically typed value trees supplied by the schema
//! layer. The platform rejects optional fields that are present but empty, so
//! every Create/Update payload is run through [`sanitize`] before it is
//! serialized into a script.

use serde_json::{Map, Value};

/// Unordered mapping from field name to a dynamically typed value tree.
pub type Fields = Map<String, Value>;

/// Recursively strip keys whose value is an empty string, empty array, or
/// empty object. Scalar zero values (`false`, `0`) are semantically
/// meaningful and survive at any depth. Idempotent and purely local.
pub fn sanitize(fields: &Fields) -> Fields {
    let mut out = Fields::new();
    for (key, value) in fields {
        let value = sanitize_value(value);
        if !is_empty(&value) {
            out.insert(key.clone(), value);
        }
    }
    out
}

/// Sanitize a single value: recurse into nested maps (pruning their empty
/// keys) and into the elements of sequences. Sequence elements are never
/// removed, only cleaned - element position is meaningful to the platform.
fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize(map)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        other => other.clone(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}
