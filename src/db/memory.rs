//! In-memory hierarchy store
//!
//! Entities live in plain tables keyed by their natural identifiers; node to
//! group membership is an explicit association set rather than back-references.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::HierarchyStore;
use crate::models::{
    ClassificationRule, CommonLayer, Environment, Node, NodeGroup, SaveCommonRequest,
    SaveEnvironmentRequest, SaveGroupRequest, SaveNodeRequest, SaveRuleRequest,
};
use crate::utils::validation::{
    validate_certname, validate_environment_name, validate_fact_path, validate_group_name,
};
use crate::utils::{EncError, EncResult};

#[derive(Debug, Default)]
struct Tables {
    common: Option<CommonLayer>,
    environments: BTreeMap<String, Environment>,
    groups: BTreeMap<Uuid, NodeGroup>,
    nodes: BTreeMap<String, Node>,
    /// (certname, group id)
    memberships: BTreeSet<(String, Uuid)>,
    /// Definition order matters for equal-priority rules
    rules: Vec<ClassificationRule>,
}

impl Tables {
    fn group_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.groups
            .values()
            .any(|g| g.name == name && Some(g.id) != except)
    }

    fn require_environment(&self, name: &str, owner: &str) -> EncResult<()> {
        if self.environments.contains_key(name) {
            Ok(())
        } else {
            Err(EncError::ValidationError(format!(
                "{} references unknown environment '{}'",
                owner, name
            )))
        }
    }

    fn require_group(&self, id: Uuid, owner: &str) -> EncResult<()> {
        if self.groups.contains_key(&id) {
            Ok(())
        } else {
            Err(EncError::ValidationError(format!(
                "{} references unknown group '{}'",
                owner, id
            )))
        }
    }
}

/// Hierarchy store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HierarchyStore for InMemoryStore {
    async fn get_common(&self) -> EncResult<Option<CommonLayer>> {
        Ok(self.tables.read().await.common.clone())
    }

    async fn save_common(&self, req: SaveCommonRequest) -> EncResult<CommonLayer> {
        let common = CommonLayer {
            classes: req.classes,
            parameters: req.parameters,
            updated_at: Utc::now(),
        };
        self.tables.write().await.common = Some(common.clone());
        debug!("Saved common layer");
        Ok(common)
    }

    async fn get_environment(&self, name: &str) -> EncResult<Option<Environment>> {
        Ok(self.tables.read().await.environments.get(name).cloned())
    }

    async fn list_environments(&self) -> EncResult<Vec<Environment>> {
        Ok(self.tables.read().await.environments.values().cloned().collect())
    }

    async fn save_environment(&self, req: SaveEnvironmentRequest) -> EncResult<Environment> {
        if !validate_environment_name(&req.name) {
            return Err(EncError::ValidationError(format!(
                "Invalid environment name '{}'",
                req.name
            )));
        }

        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let created_at = tables
            .environments
            .get(&req.name)
            .map(|e| e.created_at)
            .unwrap_or(now);

        let environment = Environment {
            name: req.name,
            description: req.description,
            classes: req.classes,
            parameters: req.parameters,
            created_at,
            updated_at: now,
        };
        tables
            .environments
            .insert(environment.name.clone(), environment.clone());
        debug!("Saved environment '{}'", environment.name);
        Ok(environment)
    }

    async fn delete_environment(&self, name: &str) -> EncResult<()> {
        match self.tables.write().await.environments.remove(name) {
            Some(_) => {
                debug!("Deleted environment '{}' (references left in place)", name);
                Ok(())
            }
            None => Err(EncError::NotFound(format!("Environment '{}'", name))),
        }
    }

    async fn get_group(&self, id: Uuid) -> EncResult<Option<NodeGroup>> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn get_group_by_name(&self, name: &str) -> EncResult<Option<NodeGroup>> {
        Ok(self
            .tables
            .read()
            .await
            .groups
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    async fn list_groups(&self) -> EncResult<Vec<NodeGroup>> {
        let mut groups: Vec<NodeGroup> =
            self.tables.read().await.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn save_group(&self, id: Option<Uuid>, req: SaveGroupRequest) -> EncResult<NodeGroup> {
        if !validate_group_name(&req.name) {
            return Err(EncError::ValidationError(format!(
                "Invalid group name '{}'",
                req.name
            )));
        }

        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let (id, created_at) = match id {
            Some(id) => match tables.groups.get(&id) {
                Some(existing) => (id, existing.created_at),
                None => return Err(EncError::NotFound(format!("Group '{}'", id))),
            },
            None => (Uuid::new_v4(), now),
        };

        if tables.group_name_taken(&req.name, Some(id)) {
            return Err(EncError::Conflict(format!(
                "Group '{}' already exists",
                req.name
            )));
        }
        tables.require_environment(&req.environment, &format!("Group '{}'", req.name))?;

        let group = NodeGroup {
            id,
            name: req.name,
            environment: req.environment,
            description: req.description,
            classes: req.classes,
            parameters: req.parameters,
            created_at,
            updated_at: now,
        };
        tables.groups.insert(id, group.clone());
        debug!("Saved group '{}' ({})", group.name, group.id);
        Ok(group)
    }

    async fn delete_group(&self, id: Uuid) -> EncResult<()> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&id).is_none() {
            return Err(EncError::NotFound(format!("Group '{}'", id)));
        }
        tables.memberships.retain(|(_, group_id)| *group_id != id);
        debug!("Deleted group {}", id);
        Ok(())
    }

    async fn get_node(&self, certname: &str) -> EncResult<Option<Node>> {
        Ok(self.tables.read().await.nodes.get(certname).cloned())
    }

    async fn list_nodes(&self) -> EncResult<Vec<Node>> {
        Ok(self.tables.read().await.nodes.values().cloned().collect())
    }

    async fn save_node(&self, req: SaveNodeRequest) -> EncResult<Node> {
        if !validate_certname(&req.certname) {
            return Err(EncError::ValidationError(format!(
                "Invalid certname '{}'",
                req.certname
            )));
        }

        let mut tables = self.tables.write().await;
        let owner = format!("Node '{}'", req.certname);
        tables.require_environment(&req.environment, &owner)?;
        for group_id in &req.group_ids {
            tables.require_group(*group_id, &owner)?;
        }

        let now = Utc::now();
        let created_at = tables
            .nodes
            .get(&req.certname)
            .map(|n| n.created_at)
            .unwrap_or(now);

        let node = Node {
            certname: req.certname,
            environment: req.environment,
            classes: req.classes,
            parameters: req.parameters,
            is_pinned: true,
            created_at,
            updated_at: now,
        };

        let certname = node.certname.clone();
        tables.memberships.retain(|(c, _)| *c != certname);
        for group_id in req.group_ids {
            tables.memberships.insert((certname.clone(), group_id));
        }
        tables.nodes.insert(certname, node.clone());
        debug!("Saved node '{}'", node.certname);
        Ok(node)
    }

    async fn delete_node(&self, certname: &str) -> EncResult<()> {
        let mut tables = self.tables.write().await;
        if tables.nodes.remove(certname).is_none() {
            return Err(EncError::NotFound(format!("Node '{}'", certname)));
        }
        tables.memberships.retain(|(c, _)| c != certname);
        debug!("Deleted node '{}'", certname);
        Ok(())
    }

    async fn list_groups_for_node(&self, certname: &str) -> EncResult<Vec<NodeGroup>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|(c, _)| c == certname)
            .filter_map(|(_, group_id)| tables.groups.get(group_id).cloned())
            .collect())
    }

    async fn get_rule(&self, id: Uuid) -> EncResult<Option<ClassificationRule>> {
        Ok(self
            .tables
            .read()
            .await
            .rules
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_rules(&self) -> EncResult<Vec<ClassificationRule>> {
        Ok(self.tables.read().await.rules.clone())
    }

    async fn list_enabled_rules_by_priority_desc(&self) -> EncResult<Vec<ClassificationRule>> {
        let mut rules: Vec<ClassificationRule> = self
            .tables
            .read()
            .await
            .rules
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(rules)
    }

    async fn save_rule(
        &self,
        id: Option<Uuid>,
        req: SaveRuleRequest,
    ) -> EncResult<ClassificationRule> {
        if req.name.trim().is_empty() {
            return Err(EncError::ValidationError(
                "Rule name cannot be empty".to_string(),
            ));
        }
        if let Some(path) = req.fact_match.keys().find(|p| !validate_fact_path(p)) {
            return Err(EncError::ValidationError(format!(
                "Invalid fact path '{}' in rule '{}'",
                path, req.name
            )));
        }

        let mut tables = self.tables.write().await;
        tables.require_group(req.group_id, &format!("Rule '{}'", req.name))?;

        let position = match id {
            Some(id) => match tables.rules.iter().position(|r| r.id == id) {
                Some(pos) => Some(pos),
                None => return Err(EncError::NotFound(format!("Rule '{}'", id))),
            },
            None => None,
        };
        let id = id.unwrap_or_else(Uuid::new_v4);

        if tables.rules.iter().any(|r| r.name == req.name && r.id != id) {
            return Err(EncError::Conflict(format!(
                "Rule '{}' already exists",
                req.name
            )));
        }

        let now = Utc::now();
        let rule = ClassificationRule {
            id,
            name: req.name,
            description: req.description,
            priority: req.priority,
            fact_match: req.fact_match,
            group_id: req.group_id,
            enabled: req.enabled,
            created_at: position.map(|p| tables.rules[p].created_at).unwrap_or(now),
            updated_at: now,
        };

        match position {
            Some(pos) => tables.rules[pos] = rule.clone(),
            None => tables.rules.push(rule.clone()),
        }
        debug!("Saved rule '{}' (priority {})", rule.name, rule.priority);
        Ok(rule)
    }

    async fn delete_rule(&self, id: Uuid) -> EncResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.rules.len();
        tables.rules.retain(|r| r.id != id);
        if tables.rules.len() == before {
            return Err(EncError::NotFound(format!("Rule '{}'", id)));
        }
        Ok(())
    }
}
