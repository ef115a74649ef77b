//! Node classification service
//!
//! Resolves the final classification of a node by merging, lowest priority
//! first:
//!
//! 1. the common layer
//! 2. the node's environment
//! 3. groups selected by matching classification rules (fact rules strategy only)
//! 4. the groups the node is a member of, ordered by name
//! 5. the node itself
//!
//! Absent records are empty layers. Only an unreachable or slow hierarchy
//! store fails a resolution; fact source problems just disable rule matching.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::HierarchyStore;
use crate::models::{
    AppliedLayer, Classification, ClassificationReport, ClassificationRule, LayerKind, Layered,
    MatchType, NodeGroup, DEFAULT_ENVIRONMENT,
};
use crate::services::facts::FactProvider;
use crate::services::merge::deep_merge;
use crate::services::rules::matching_rules;
use crate::utils::{EncError, EncResult};

/// Default deadline for each store or fact source call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which layers take part in a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationStrategy {
    /// Common, environment, group membership and node layers
    #[default]
    Hierarchical,
    /// Hierarchical layers plus groups selected by fact-matching rules
    #[serde(alias = "fact_rules", alias = "rules")]
    FactRules,
}

impl ClassificationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationStrategy::Hierarchical => "hierarchical",
            ClassificationStrategy::FactRules => "factrules",
        }
    }

    /// Parse a strategy name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hierarchical" => Some(ClassificationStrategy::Hierarchical),
            "factrules" | "fact_rules" | "rules" => Some(ClassificationStrategy::FactRules),
            _ => None,
        }
    }
}

impl fmt::Display for ClassificationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running merge of layers into a classification
struct Accumulator {
    classification: Classification,
    layers: Vec<AppliedLayer>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            classification: Classification::default(),
            layers: Vec::new(),
        }
    }

    fn apply(
        &mut self,
        kind: LayerKind,
        name: &str,
        match_type: MatchType,
        group_id: Option<Uuid>,
        source: &dyn Layered,
    ) {
        self.classification.classes = deep_merge(&self.classification.classes, source.classes());
        self.classification.parameters =
            deep_merge(&self.classification.parameters, source.parameters());
        self.layers.push(AppliedLayer {
            kind,
            name: name.to_string(),
            match_type,
            group_id,
        });
    }
}

/// Classification service resolving nodes against a hierarchy store
#[derive(Clone)]
pub struct ClassificationService {
    store: Arc<dyn HierarchyStore>,
    facts: Arc<dyn FactProvider>,
    strategy: ClassificationStrategy,
    timeout: Duration,
}

impl ClassificationService {
    /// Create a new classification service using the hierarchical strategy
    pub fn new(store: Arc<dyn HierarchyStore>, facts: Arc<dyn FactProvider>) -> Self {
        Self {
            store,
            facts,
            strategy: ClassificationStrategy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_strategy(mut self, strategy: ClassificationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Deadline applied to each store and fact source call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn strategy(&self) -> ClassificationStrategy {
        self.strategy
    }

    /// Classify a node, looking its facts up when the strategy needs them
    pub async fn resolve(&self, certname: &str) -> EncResult<Classification> {
        Ok(self.explain(certname).await?.classification)
    }

    /// Classify a node with caller-supplied facts instead of the fact provider
    ///
    /// `None` or an empty map means the facts are unknown.
    pub async fn resolve_with_facts(
        &self,
        certname: &str,
        facts: Option<Map<String, Value>>,
    ) -> EncResult<Classification> {
        let facts = facts.filter(|f| !f.is_empty()).map(Value::Object);
        Ok(self.classify(certname, facts).await?.classification)
    }

    /// Classify a node and report every layer that contributed, in merge order
    pub async fn explain(&self, certname: &str) -> EncResult<ClassificationReport> {
        let facts = match self.strategy {
            ClassificationStrategy::FactRules => self.lookup_facts(certname).await,
            ClassificationStrategy::Hierarchical => None,
        };
        self.classify(certname, facts).await
    }

    /// Classify a node, answering with the default classification on failure
    ///
    /// Puppet agents must not be blocked by an unreachable classifier.
    pub async fn resolve_or_default(&self, certname: &str) -> Classification {
        match self.resolve(certname).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(
                    "Classification of {} failed ({}), serving the default classification",
                    certname, e
                );
                Classification::default()
            }
        }
    }

    async fn classify(
        &self,
        certname: &str,
        facts: Option<Value>,
    ) -> EncResult<ClassificationReport> {
        debug!(
            "Classifying {} with strategy {} (facts available: {})",
            certname,
            self.strategy,
            facts.is_some()
        );
        let mut acc = Accumulator::new();

        if let Some(common) = self.store_call("get_common", self.store.get_common()).await? {
            acc.apply(LayerKind::Common, "common", MatchType::Default, None, &common);
        }

        let node = self
            .store_call("get_node", self.store.get_node(certname))
            .await?;

        let rule_groups = match (self.strategy, facts.as_ref()) {
            (ClassificationStrategy::FactRules, Some(facts)) => self.rule_groups(facts).await?,
            (ClassificationStrategy::FactRules, None) => {
                debug!("No facts for {}, skipping classification rules", certname);
                Vec::new()
            }
            (ClassificationStrategy::Hierarchical, _) => Vec::new(),
        };

        // Default, then the highest-priority rule's group, then the node itself
        let mut environment = DEFAULT_ENVIRONMENT.to_string();
        if let Some((_, group)) = rule_groups.first() {
            environment = group.environment.clone();
        }
        if let Some(ref node) = node {
            environment = node.environment.clone();
        }

        match self
            .store_call("get_environment", self.store.get_environment(&environment))
            .await?
        {
            Some(env) => acc.apply(
                LayerKind::Environment,
                &env.name,
                MatchType::Default,
                None,
                &env,
            ),
            None => debug!("Environment '{}' is not defined, skipping its layer", environment),
        }
        acc.classification.environment = environment;

        // Lowest priority first so the highest-priority rule wins
        for (rule, group) in rule_groups.iter().rev() {
            acc.apply(
                LayerKind::Rule,
                &rule.name,
                MatchType::Rules,
                Some(group.id),
                group,
            );
        }

        if let Some(node) = node {
            let mut groups = self
                .store_call(
                    "list_groups_for_node",
                    self.store.list_groups_for_node(certname),
                )
                .await?;
            groups.sort_by(|a, b| a.name.cmp(&b.name));

            for group in &groups {
                acc.apply(
                    LayerKind::Group,
                    &group.name,
                    MatchType::Pinned,
                    Some(group.id),
                    group,
                );
            }
            acc.apply(
                LayerKind::Node,
                &node.certname,
                MatchType::Pinned,
                None,
                &node,
            );
        }

        info!(
            "Classified {}: environment={} classes={} parameters={} layers={}",
            certname,
            acc.classification.environment,
            acc.classification.classes.len(),
            acc.classification.parameters.len(),
            acc.layers.len()
        );

        Ok(ClassificationReport {
            certname: certname.to_string(),
            strategy: self.strategy.to_string(),
            facts_available: facts.is_some(),
            layers: acc.layers,
            classification: acc.classification,
        })
    }

    /// Matching rules paired with their target groups, highest priority first
    ///
    /// Rules pointing at a group that no longer exists are skipped.
    async fn rule_groups(&self, facts: &Value) -> EncResult<Vec<(ClassificationRule, NodeGroup)>> {
        let rules = self
            .store_call(
                "list_enabled_rules_by_priority_desc",
                self.store.list_enabled_rules_by_priority_desc(),
            )
            .await?;

        let matched = matching_rules(facts, &rules);
        let groups = try_join_all(
            matched
                .iter()
                .map(|rule| self.store_call("get_group", self.store.get_group(rule.group_id))),
        )
        .await?;

        Ok(matched
            .into_iter()
            .zip(groups)
            .filter_map(|(rule, group)| match group {
                Some(group) => Some((rule.clone(), group)),
                None => {
                    warn!(
                        "Rule '{}' targets missing group {}, skipping",
                        rule.name, rule.group_id
                    );
                    None
                }
            })
            .collect())
    }

    /// Facts of a node as a JSON object, or `None` when they cannot be had
    async fn lookup_facts(&self, certname: &str) -> Option<Value> {
        match tokio::time::timeout(self.timeout, self.facts.facts(certname)).await {
            Ok(Ok(Some(facts))) if !facts.is_empty() => Some(Value::Object(facts)),
            Ok(Ok(_)) => {
                debug!("No facts known for {}", certname);
                None
            }
            Ok(Err(e)) => {
                warn!("Fact lookup for {} failed: {}", certname, e);
                None
            }
            Err(_) => {
                warn!(
                    "Fact lookup for {} timed out after {:?}",
                    certname, self.timeout
                );
                None
            }
        }
    }

    /// Run a store call under the service deadline
    async fn store_call<T>(
        &self,
        operation: &str,
        call: impl Future<Output = EncResult<T>>,
    ) -> EncResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                EncError::Timeout(format!(
                    "Hierarchy store call {} exceeded {:?}",
                    operation, self.timeout
                ))
            })?
    }
}
