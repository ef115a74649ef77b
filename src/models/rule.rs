//! Fact-driven classification rule data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dotted fact path -> expected scalar, or list of acceptable scalars
pub type FactPredicate = serde_json::Map<String, serde_json::Value>;

/// Rule that injects a group's classes/parameters into nodes whose facts match
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationRule {
    /// Unique identifier
    pub id: Uuid,

    /// Unique rule name
    pub name: String,

    pub description: Option<String>,

    /// Higher = evaluated first and wins conflicts
    pub priority: i32,

    /// All entries must match (AND); empty matches every node
    pub fact_match: FactPredicate,

    /// Group applied on match
    pub group_id: Uuid,

    pub enabled: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ClassificationRule {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            description: None,
            priority: 0,
            fact_match: FactPredicate::new(),
            group_id: Uuid::nil(),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to create or replace a classification rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub fact_match: FactPredicate,
    pub group_id: Uuid,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
