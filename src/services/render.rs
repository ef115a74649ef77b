//! Classification output formats
//!
//! YAML is what the Puppet server reads from an ENC script: block style, keys
//! sorted at every level, no anchors or aliases. The server parses it as YAML
//! 1.1, so strings that 1.1 reads as booleans or base-60 numbers are quoted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::models::Classification;
use crate::utils::{EncError, EncResult};

/// Plain scalars that YAML 1.1 resolves to something other than a string
static YAML11_NON_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(y|Y|yes|Yes|YES|n|N|no|No|NO|on|On|ON|off|Off|OFF|true|True|TRUE|false|False|FALSE|null|Null|NULL|~|[-+]?[0-9][0-9_]*(:[0-5]?[0-9])+(\.[0-9_]*)?)$",
    )
    .unwrap()
});

/// YAML for the default classification, served when nothing better is available
pub const FALLBACK_YAML: &str = "classes: {}\nenvironment: production\nparameters: {}\n";

/// Render a classification as pretty-printed JSON
pub fn to_json(classification: &Classification) -> EncResult<String> {
    serde_json::to_string_pretty(classification)
        .map_err(|e| EncError::Internal(format!("Failed to render classification as JSON: {}", e)))
}

/// Render a classification as block-style YAML with sorted keys
pub fn to_yaml(classification: &Classification) -> EncResult<String> {
    // Going through a JSON value sorts the top-level keys as well
    let value = serde_json::to_value(classification)
        .map_err(|e| EncError::Internal(format!("Failed to render classification: {}", e)))?;

    let mut quoted = QuotedScalars::new();
    let document = quoted.convert(value)?;
    let yaml = serde_norway::to_string(&document).map_err(|e| {
        EncError::Internal(format!("Failed to render classification as YAML: {}", e))
    })?;
    Ok(quoted.restore(yaml))
}

/// Swaps YAML 1.1 lookalike strings for unique plain placeholders before
/// serialization, then puts them back single-quoted
struct QuotedScalars {
    prefix: String,
    originals: Vec<String>,
}

impl QuotedScalars {
    fn new() -> Self {
        Self {
            prefix: format!("openvox-enc-{}", Uuid::new_v4().simple()),
            originals: Vec::new(),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("{}-{}-q", self.prefix, index)
    }

    fn protect(&mut self, s: String) -> String {
        if !YAML11_NON_STRING.is_match(&s) {
            return s;
        }
        let index = match self.originals.iter().position(|o| *o == s) {
            Some(index) => index,
            None => {
                self.originals.push(s);
                self.originals.len() - 1
            }
        };
        self.placeholder(index)
    }

    /// Convert to a YAML value, keeping the (sorted) key order of the input
    fn convert(&mut self, value: Value) -> EncResult<serde_norway::Value> {
        Ok(match value {
            Value::String(s) => serde_norway::Value::String(self.protect(s)),
            Value::Array(items) => serde_norway::Value::Sequence(
                items
                    .into_iter()
                    .map(|item| self.convert(item))
                    .collect::<EncResult<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                let mut mapping = serde_norway::Mapping::new();
                for (key, item) in map {
                    let key = serde_norway::Value::String(self.protect(key));
                    mapping.insert(key, self.convert(item)?);
                }
                serde_norway::Value::Mapping(mapping)
            }
            scalar => serde_norway::to_value(&scalar).map_err(|e| {
                EncError::Internal(format!("Failed to render classification as YAML: {}", e))
            })?,
        })
    }

    fn restore(&self, yaml: String) -> String {
        self.originals
            .iter()
            .enumerate()
            .fold(yaml, |yaml, (index, original)| {
                yaml.replace(&self.placeholder(index), &format!("'{}'", original))
            })
    }
}

/// YAML for the default classification
pub fn fallback_yaml() -> String {
    FALLBACK_YAML.to_string()
}
