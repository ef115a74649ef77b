//! Hierarchy definitions loaded from a YAML file
//!
//! The file mirrors the store contents, with groups referenced by name:
//!
//! ```yaml
//! common:
//!   classes: { "profile::base": {} }
//! environments:
//!   - name: production
//! groups:
//!   - name: webservers
//!     environment: production
//!     classes: { nginx: { workers: 4 } }
//! nodes:
//!   - certname: web1.example.com
//!     groups: [webservers]
//! rules:
//!   - name: redhat
//!     priority: 10
//!     fact_match: { os.family: RedHat }
//!     group: webservers
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::HierarchyStore;
use crate::models::{
    ClassMap, FactPredicate, ParameterMap, SaveCommonRequest, SaveEnvironmentRequest,
    SaveGroupRequest, SaveNodeRequest, SaveRuleRequest, DEFAULT_ENVIRONMENT,
};
use crate::utils::{EncError, EncResult};

/// Complete hierarchy document
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HierarchySeed {
    #[serde(default)]
    pub common: Option<SaveCommonRequest>,
    #[serde(default)]
    pub environments: Vec<SaveEnvironmentRequest>,
    #[serde(default)]
    pub groups: Vec<SaveGroupRequest>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Node definition referencing groups by name
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeDefinition {
    pub certname: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub classes: ClassMap,
    #[serde(default)]
    pub parameters: ParameterMap,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Rule definition referencing its target group by name
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub fact_match: FactPredicate,
    pub group: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

fn default_enabled() -> bool {
    true
}

/// Counts of records written by [`HierarchySeed::apply`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub environments: usize,
    pub groups: usize,
    pub nodes: usize,
    pub rules: usize,
}

impl HierarchySeed {
    /// Load a hierarchy file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read hierarchy file: {:?}", path))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse hierarchy file: {:?}", path))
    }

    /// Parse a hierarchy document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_norway::from_str(contents)?)
    }

    /// Find a hierarchy file in standard locations
    pub fn find_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("hierarchy.yaml"),
            PathBuf::from("config/hierarchy.yaml"),
            PathBuf::from("/etc/openvox-enc/hierarchy.yaml"),
            dirs::config_dir()
                .map(|p| p.join("openvox-enc/hierarchy.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Write every definition through the store's validated save calls
    ///
    /// Order: common, environments, groups, nodes, rules, so that every
    /// reference is resolvable when it is written.
    pub async fn apply<S: HierarchyStore + ?Sized>(self, store: &S) -> EncResult<SeedSummary> {
        let mut summary = SeedSummary::default();

        if let Some(common) = self.common {
            store.save_common(common).await?;
        }

        for environment in self.environments {
            store.save_environment(environment).await?;
            summary.environments += 1;
        }

        for group in self.groups {
            let id = store.get_group_by_name(&group.name).await?.map(|g| g.id);
            store.save_group(id, group).await?;
            summary.groups += 1;
        }

        for node in self.nodes {
            let mut group_ids = Vec::with_capacity(node.groups.len());
            for name in &node.groups {
                let group = store.get_group_by_name(name).await?.ok_or_else(|| {
                    EncError::ValidationError(format!(
                        "Node '{}' references unknown group '{}'",
                        node.certname, name
                    ))
                })?;
                group_ids.push(group.id);
            }

            store
                .save_node(SaveNodeRequest {
                    certname: node.certname,
                    environment: node.environment,
                    classes: node.classes,
                    parameters: node.parameters,
                    group_ids,
                })
                .await?;
            summary.nodes += 1;
        }

        let existing_rules = store.list_rules().await?;
        for rule in self.rules {
            let group = store.get_group_by_name(&rule.group).await?.ok_or_else(|| {
                EncError::ValidationError(format!(
                    "Rule '{}' references unknown group '{}'",
                    rule.name, rule.group
                ))
            })?;
            let id = existing_rules
                .iter()
                .find(|r| r.name == rule.name)
                .map(|r| r.id);

            store
                .save_rule(
                    id,
                    SaveRuleRequest {
                        name: rule.name,
                        description: rule.description,
                        priority: rule.priority,
                        fact_match: rule.fact_match,
                        group_id: group.id,
                        enabled: rule.enabled,
                    },
                )
                .await?;
            summary.rules += 1;
        }

        info!(
            "Hierarchy loaded: {} environments, {} groups, {} nodes, {} rules",
            summary.environments, summary.groups, summary.nodes, summary.rules
        );
        Ok(summary)
    }
}
