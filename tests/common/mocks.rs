//! Mock services for testing
//!
//! Provides mock implementations of the fact source and the hierarchy store
//! for isolated testing of failure handling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use openvox_enc::db::HierarchyStore;
use openvox_enc::models::{
    ClassificationRule, CommonLayer, Environment, Node, NodeGroup, SaveCommonRequest,
    SaveEnvironmentRequest, SaveGroupRequest, SaveNodeRequest, SaveRuleRequest,
};
use openvox_enc::services::FactProvider;
use openvox_enc::{EncError, EncResult};

/// Types of errors the mocks can simulate
#[derive(Debug, Clone)]
pub enum MockError {
    /// Connection refused
    ConnectionRefused,
    /// Never answers
    Hang,
    /// Internal server error
    InternalError(String),
}

/// Mock fact source for testing
#[derive(Default)]
pub struct MockFactSource {
    facts: RwLock<HashMap<String, Map<String, Value>>>,
    /// Simulate errors when set
    pub error_mode: RwLock<Option<MockError>>,
    calls: AtomicUsize,
}

impl MockFactSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add facts for a node
    pub fn add_facts(&self, certname: &str, facts: Value) {
        if let Value::Object(map) = facts {
            self.facts
                .write()
                .unwrap()
                .insert(certname.to_string(), map);
        }
    }

    /// Set error mode to simulate failures
    pub fn set_error_mode(&self, error: MockError) {
        *self.error_mode.write().unwrap() = Some(error);
    }

    /// Number of lookups performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FactProvider for MockFactSource {
    async fn facts(&self, certname: &str) -> EncResult<Option<Map<String, Value>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let error = self.error_mode.read().unwrap().clone();
        match error {
            Some(MockError::ConnectionRefused) => {
                Err(EncError::FactSource("connection refused".to_string()))
            }
            Some(MockError::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
            Some(MockError::InternalError(msg)) => Err(EncError::FactSource(msg)),
            None => Ok(self.facts.read().unwrap().get(certname).cloned()),
        }
    }
}

/// Hierarchy store that is never reachable
pub struct FailingStore {
    mode: MockError,
}

impl FailingStore {
    pub fn new(mode: MockError) -> Arc<Self> {
        Arc::new(Self { mode })
    }

    async fn fail<T>(&self) -> EncResult<T> {
        match &self.mode {
            MockError::ConnectionRefused => {
                Err(EncError::Store("connection refused".to_string()))
            }
            MockError::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(EncError::Store("gave up".to_string()))
            }
            MockError::InternalError(msg) => Err(EncError::Store(msg.clone())),
        }
    }
}

#[async_trait]
impl HierarchyStore for FailingStore {
    async fn get_common(&self) -> EncResult<Option<CommonLayer>> {
        self.fail().await
    }

    async fn save_common(&self, _req: SaveCommonRequest) -> EncResult<CommonLayer> {
        self.fail().await
    }

    async fn get_environment(&self, _name: &str) -> EncResult<Option<Environment>> {
        self.fail().await
    }

    async fn list_environments(&self) -> EncResult<Vec<Environment>> {
        self.fail().await
    }

    async fn save_environment(&self, _req: SaveEnvironmentRequest) -> EncResult<Environment> {
        self.fail().await
    }

    async fn delete_environment(&self, _name: &str) -> EncResult<()> {
        self.fail().await
    }

    async fn get_group(&self, _id: Uuid) -> EncResult<Option<NodeGroup>> {
        self.fail().await
    }

    async fn get_group_by_name(&self, _name: &str) -> EncResult<Option<NodeGroup>> {
        self.fail().await
    }

    async fn list_groups(&self) -> EncResult<Vec<NodeGroup>> {
        self.fail().await
    }

    async fn save_group(&self, _id: Option<Uuid>, _req: SaveGroupRequest) -> EncResult<NodeGroup> {
        self.fail().await
    }

    async fn delete_group(&self, _id: Uuid) -> EncResult<()> {
        self.fail().await
    }

    async fn get_node(&self, _certname: &str) -> EncResult<Option<Node>> {
        self.fail().await
    }

    async fn list_nodes(&self) -> EncResult<Vec<Node>> {
        self.fail().await
    }

    async fn save_node(&self, _req: SaveNodeRequest) -> EncResult<Node> {
        self.fail().await
    }

    async fn delete_node(&self, _certname: &str) -> EncResult<()> {
        self.fail().await
    }

    async fn list_groups_for_node(&self, _certname: &str) -> EncResult<Vec<NodeGroup>> {
        self.fail().await
    }

    async fn get_rule(&self, _id: Uuid) -> EncResult<Option<ClassificationRule>> {
        self.fail().await
    }

    async fn list_rules(&self) -> EncResult<Vec<ClassificationRule>> {
        self.fail().await
    }

    async fn list_enabled_rules_by_priority_desc(&self) -> EncResult<Vec<ClassificationRule>> {
        self.fail().await
    }

    async fn save_rule(
        &self,
        _id: Option<Uuid>,
        _req: SaveRuleRequest,
    ) -> EncResult<ClassificationRule> {
        self.fail().await
    }

    async fn delete_rule(&self, _id: Uuid) -> EncResult<()> {
        self.fail().await
    }
}
