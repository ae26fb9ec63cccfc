//! Canonical corpus fingerprints
//!
//! Records are serialized to JSON with recursively sorted object keys and no
//! whitespace, then hashed with BLAKE3. Two corpora with the same records in
//! the same order always share a fingerprint.

use crate::errors::{CoreError, Result};
use crate::record::ShopRecord;
use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize a value to canonical JSON (sorted keys, compact)
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)
        .map_err(|e| CoreError::InvalidParameters(format!("canonical json: {}", e)))?;
    serde_json::to_string(&canonicalize(value))
        .map_err(|e| CoreError::InvalidParameters(format!("canonical json: {}", e)))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, val) in entries {
                sorted.insert(key, canonicalize(val));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Hex BLAKE3 digest of the canonical serialization of `records`
pub fn corpus_fingerprint(records: &[ShopRecord]) -> Result<String> {
    let json = to_canonical_json(&records)?;
    Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
}
