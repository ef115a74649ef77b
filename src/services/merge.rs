//! Deep merge of class and parameter maps
//!
//! Maps merge key by key, recursively when both sides hold a map. Anything
//! else (scalars, lists, a map meeting a non-map) is replaced wholesale by the
//! override side. Lists are never concatenated.

use serde_json::{Map, Value};

/// Merge `overlay` over `base`, returning a new map
pub fn deep_merge(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut result = base.clone();
    for (key, value) in overlay {
        let merged = match (result.get(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(deep_merge(existing, incoming))
            }
            _ => value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

/// Fold layers left to right, lowest priority first
pub fn merge_all<'a, I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    layers
        .into_iter()
        .fold(Map::new(), |acc, layer| deep_merge(&acc, layer))
}
