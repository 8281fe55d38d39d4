//! Estimated-memory accounting used for admission control only; figures do
//! not track actual allocation.

use serde_json::Value;

const OBJECT_OVERHEAD: usize = 40;
const SCALAR_BYTES: usize = 8;

/// Strings cost two bytes per char plus fixed overhead.
pub fn estimate_string(s: &str) -> usize {
    2 * s.chars().count() + OBJECT_OVERHEAD
}

/// Recursive estimate over a JSON value.
pub fn estimate_value(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => SCALAR_BYTES,
        Value::String(s) => estimate_string(s),
        Value::Array(items) => {
            OBJECT_OVERHEAD + items.iter().map(estimate_value).sum::<usize>()
        }
        Value::Object(map) => {
            OBJECT_OVERHEAD
                + map
                    .iter()
                    .map(|(k, v)| estimate_string(k) + estimate_value(v))
                    .sum::<usize>()
        }
    }
}
