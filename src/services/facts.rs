//! Fact sources consulted by the classifier

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::facts_to_map;
use crate::services::puppetdb::PuppetDbClient;
use crate::utils::EncResult;

/// Supplies the fact set of a node
#[async_trait]
pub trait FactProvider: Send + Sync {
    /// Facts keyed by fact name, or `None` when the node is unknown to the source
    async fn facts(&self, certname: &str) -> EncResult<Option<Map<String, Value>>>;
}

/// Facts looked up in PuppetDB
pub struct PuppetDbFactProvider {
    client: PuppetDbClient,
}

impl PuppetDbFactProvider {
    pub fn new(client: PuppetDbClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FactProvider for PuppetDbFactProvider {
    async fn facts(&self, certname: &str) -> EncResult<Option<Map<String, Value>>> {
        let facts = self.client.get_node_facts(certname).await?;
        debug!("PuppetDB returned {} facts for {}", facts.len(), certname);

        if facts.is_empty() {
            return Ok(None);
        }
        Ok(Some(facts_to_map(facts)))
    }
}

/// Fixed fact sets held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticFactProvider {
    nodes: HashMap<String, Map<String, Value>>,
}

impl StaticFactProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_node(mut self, certname: impl Into<String>, facts: Value) -> Self {
        self.insert(certname, facts);
        self
    }

    /// Set the facts of a node; anything but a JSON object clears them
    pub fn insert(&mut self, certname: impl Into<String>, facts: Value) {
        let certname = certname.into();
        match facts {
            Value::Object(map) => {
                self.nodes.insert(certname, map);
            }
            _ => {
                self.nodes.remove(&certname);
            }
        }
    }
}

#[async_trait]
impl FactProvider for StaticFactProvider {
    async fn facts(&self, certname: &str) -> EncResult<Option<Map<String, Value>>> {
        Ok(self.nodes.get(certname).cloned())
    }
}

/// Fact source that never knows any node
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFacts;

#[async_trait]
impl FactProvider for NoFacts {
    async fn facts(&self, _certname: &str) -> EncResult<Option<Map<String, Value>>> {
        Ok(None)
    }
}
