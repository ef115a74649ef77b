//! Dotted fact path resolution

use serde_json::Value;

/// Get a fact value by path (e.g., "os.family" -> facts["os"]["family"])
///
/// Maps are descended by key and lists by decimal index. A missing key, an
/// unusable index, a scalar met mid-path or a `null` leaf all resolve to
/// `None`.
pub fn resolve_fact_path<'a>(facts: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = facts;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// String form used when comparing fact values against rule expectations
///
/// Strings compare verbatim; other values use their JSON text, so the fact
/// `8` matches the expectation `"8"` and vice versa.
pub fn fact_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
