//! Hierarchy store
//!
//! This module defines the storage contract consumed by the classifier:
//! - The singleton common layer
//! - Environments, node groups and node classifications
//! - Node/group memberships
//! - Fact-driven classification rules
//!
//! Reads return `Ok(None)` (or an empty list) for absent records; only writes
//! validate and fail with client errors.

pub mod memory;
pub mod seed;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    ClassificationRule, CommonLayer, Environment, Node, NodeGroup, SaveCommonRequest,
    SaveEnvironmentRequest, SaveGroupRequest, SaveNodeRequest, SaveRuleRequest,
};
use crate::utils::EncResult;

pub use memory::InMemoryStore;
pub use seed::HierarchySeed;

/// CRUD access to the four hierarchy layers and the rule table
#[async_trait]
pub trait HierarchyStore: Send + Sync {
    /// Get the common layer, if it has ever been written
    async fn get_common(&self) -> EncResult<Option<CommonLayer>>;

    /// Create or replace the common layer
    async fn save_common(&self, req: SaveCommonRequest) -> EncResult<CommonLayer>;

    async fn get_environment(&self, name: &str) -> EncResult<Option<Environment>>;

    /// All environments, ordered by name
    async fn list_environments(&self) -> EncResult<Vec<Environment>>;

    /// Create or replace an environment keyed by name
    async fn save_environment(&self, req: SaveEnvironmentRequest) -> EncResult<Environment>;

    /// Delete an environment; groups and nodes referencing it are left in place
    async fn delete_environment(&self, name: &str) -> EncResult<()>;

    async fn get_group(&self, id: Uuid) -> EncResult<Option<NodeGroup>>;

    async fn get_group_by_name(&self, name: &str) -> EncResult<Option<NodeGroup>>;

    /// All groups, ordered by name
    async fn list_groups(&self) -> EncResult<Vec<NodeGroup>>;

    /// Create a group (`id` = None) or fully replace an existing one
    async fn save_group(&self, id: Option<Uuid>, req: SaveGroupRequest) -> EncResult<NodeGroup>;

    /// Delete a group together with its memberships
    async fn delete_group(&self, id: Uuid) -> EncResult<()>;

    async fn get_node(&self, certname: &str) -> EncResult<Option<Node>>;

    /// All node classifications, ordered by certname
    async fn list_nodes(&self) -> EncResult<Vec<Node>>;

    /// Create or fully replace a node classification and its memberships
    async fn save_node(&self, req: SaveNodeRequest) -> EncResult<Node>;

    /// Delete a node classification together with its memberships
    async fn delete_node(&self, certname: &str) -> EncResult<()>;

    /// Groups the node is a member of (any order)
    async fn list_groups_for_node(&self, certname: &str) -> EncResult<Vec<NodeGroup>>;

    async fn get_rule(&self, id: Uuid) -> EncResult<Option<ClassificationRule>>;

    /// All rules in definition order
    async fn list_rules(&self) -> EncResult<Vec<ClassificationRule>>;

    /// Enabled rules, highest priority first, ties in definition order
    async fn list_enabled_rules_by_priority_desc(&self) -> EncResult<Vec<ClassificationRule>>;

    /// Create a rule (`id` = None) or fully replace an existing one
    async fn save_rule(
        &self,
        id: Option<Uuid>,
        req: SaveRuleRequest,
    ) -> EncResult<ClassificationRule>;

    async fn delete_rule(&self, id: Uuid) -> EncResult<()>;
}
