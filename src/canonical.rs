//! Canonical JSON encoding used for commit hashing and on-disk persistence.
//!
//! The crate never enables `serde_json`'s `preserve_order` feature, so
//! `serde_json::Map` is backed by a `BTreeMap` and iterates keys in sorted
//! order. Converting any `Serialize` value through `serde_json::Value` before
//! printing it therefore yields deterministic, lexicographically-sorted
//! object keys for free — that is "canonical JSON" for this crate's purposes.

use serde::Serialize;
use serde_json::Value;

use crate::errors::CodexError;

/// Render `value` as canonical JSON text (sorted keys, compact).
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, CodexError> {
    let v = serde_json::to_value(value)
        .map_err(|e| CodexError::MalformedData(format!("encoding to json: {e}")))?;
    serde_json::to_string(&sort_value(v))
        .map_err(|e| CodexError::MalformedData(format!("rendering canonical json: {e}")))
}

/// Render `value` as canonical JSON bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CodexError> {
    Ok(to_canonical_string(value)?.into_bytes())
}

/// `serde_json::Value`'s `Map` is already key-sorted without the
/// `preserve_order` feature; this just recurses so nested objects are sorted
/// too, independent of how they were originally constructed.
fn sort_value(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            for (k, val) in map {
                sorted.insert(k, sort_value(val));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        other => other,
    }
}
