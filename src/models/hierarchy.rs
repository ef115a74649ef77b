//! Hierarchy layer data model
//!
//! The four classification layers, lowest priority first: Common,
//! Environment, Group, Node. Each carries a class map
//! (`{"ntp": {"servers": [..]}}`) and a flat parameter map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DEFAULT_ENVIRONMENT;

/// Class name -> per-class parameters
pub type ClassMap = serde_json::Map<String, serde_json::Value>;

/// Top-level parameter name -> value
pub type ParameterMap = serde_json::Map<String, serde_json::Value>;

/// Uniform read access to the maps of any hierarchy layer
pub trait Layered {
    fn classes(&self) -> &ClassMap;
    fn parameters(&self) -> &ParameterMap;
}

/// Fleet-wide defaults (exactly one exists once written)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommonLayer {
    #[serde(default)]
    pub classes: ClassMap,
    #[serde(default)]
    pub parameters: ParameterMap,
    pub updated_at: DateTime<Utc>,
}

impl Default for CommonLayer {
    fn default() -> Self {
        Self {
            classes: ClassMap::new(),
            parameters: ParameterMap::new(),
            updated_at: Utc::now(),
        }
    }
}

/// A Puppet environment and its layer data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    /// Unique environment name (e.g. "production")
    pub name: String,
    pub description: Option<String>,
    pub classes: ClassMap,
    pub parameters: ParameterMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A flat (non-nesting) group of nodes sharing classes and parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeGroup {
    /// Unique identifier
    pub id: Uuid,

    /// Unique group name, also the merge ordering key
    pub name: String,

    /// Environment this group belongs to
    pub environment: String,

    pub description: Option<String>,

    /// Classes to apply to member nodes
    pub classes: ClassMap,

    /// Parameters for member nodes
    pub parameters: ParameterMap,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for NodeGroup {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            description: None,
            classes: ClassMap::new(),
            parameters: ParameterMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Explicit per-node classification (highest priority layer)
///
/// Group memberships are not stored on the node; the store keeps them as a
/// separate association set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Certificate name (unique identifier)
    pub certname: String,

    /// Environment the node is pinned to
    pub environment: String,

    /// Node-specific class overrides
    pub classes: ClassMap,

    /// Node-specific parameters
    pub parameters: ParameterMap,

    /// Manually pinned (as opposed to only rule-matched)
    pub is_pinned: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

macro_rules! impl_layered {
    ($($ty:ty),+) => {
        $(
            impl Layered for $ty {
                fn classes(&self) -> &ClassMap {
                    &self.classes
                }

                fn parameters(&self) -> &ParameterMap {
                    &self.parameters
                }
            }
        )+
    };
}

impl_layered!(CommonLayer, Environment, NodeGroup, Node);

/// Request to upsert the common layer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SaveCommonRequest {
    #[serde(default)]
    pub classes: ClassMap,
    #[serde(default)]
    pub parameters: ParameterMap,
}

/// Request to create or replace an environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEnvironmentRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub classes: ClassMap,
    #[serde(default)]
    pub parameters: ParameterMap,
}

/// Request to create or replace a node group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGroupRequest {
    pub name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub classes: ClassMap,
    #[serde(default)]
    pub parameters: ParameterMap,
}

/// Request to create or replace a node classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveNodeRequest {
    pub certname: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub classes: ClassMap,
    #[serde(default)]
    pub parameters: ParameterMap,
    /// Groups the node is a member of (replaces existing memberships)
    #[serde(default)]
    pub group_ids: Vec<Uuid>,
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}
