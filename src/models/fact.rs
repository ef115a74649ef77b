//! Fact data model

use serde::{Deserialize, Serialize};

/// Represents a fact from a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// Certificate name of the node
    pub certname: String,

    /// Top-level fact name
    pub name: String,

    /// Fact value (scalar, list or nested map)
    pub value: serde_json::Value,

    /// Environment
    pub environment: Option<String>,
}

/// Fold a `{name, value}` fact list into a `{name: value}` tree
///
/// Later duplicates replace earlier ones.
pub fn facts_to_map(facts: Vec<Fact>) -> serde_json::Map<String, serde_json::Value> {
    facts
        .into_iter()
        .map(|fact| (fact.name, fact.value))
        .collect()
}
