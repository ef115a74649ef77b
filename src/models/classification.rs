//! Classification data model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ClassMap, ParameterMap};

/// Environment used when nothing more specific applies
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Final classification of a node, as consumed by the Puppet server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub environment: String,
    pub classes: ClassMap,
    pub parameters: ParameterMap,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            classes: ClassMap::new(),
            parameters: ParameterMap::new(),
        }
    }
}

/// Hierarchy layer kinds, in ascending merge priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Common,
    Environment,
    Rule,
    Group,
    Node,
}

/// How a layer came to apply to the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Applies to every node
    Default,
    /// Matched via classification rules
    Rules,
    /// Pinned (statically assigned)
    Pinned,
}

/// One layer that contributed to a classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedLayer {
    pub kind: LayerKind,
    /// Environment name, group name, rule name or certname
    pub name: String,
    pub match_type: MatchType,
    /// Group id for group and rule layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
}

/// Classification together with the layers that produced it, in merge order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub certname: String,
    pub strategy: String,
    /// Whether a fact set was available for rule matching
    pub facts_available: bool,
    pub layers: Vec<AppliedLayer>,
    pub classification: Classification,
}
