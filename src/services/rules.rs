//! Fact-driven rule matching
//!
//! A rule matches when every `fact path -> expected` entry of its predicate
//! resolves against the node's facts and compares equal (as strings), or,
//! for a list expectation, when the fact is one of the listed values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ClassificationRule, FactPredicate};
use crate::services::fact_path::{fact_as_string, resolve_fact_path};

/// Classification rule evaluation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// Rule ID
    pub rule_id: Uuid,

    /// Whether the rule matched
    pub matched: bool,

    /// First predicate path that did not match
    pub failed_path: Option<String>,
}

/// Check a single expectation against a resolved fact
fn value_matches(actual: &Value, expected: &Value) -> bool {
    let actual = fact_as_string(actual);
    match expected {
        Value::Array(accepted) => accepted.iter().any(|v| fact_as_string(v) == actual),
        other => fact_as_string(other) == actual,
    }
}

/// First predicate path that fails against `facts`, if any
fn first_mismatch<'a>(facts: &Value, predicate: &'a FactPredicate) -> Option<&'a str> {
    predicate
        .iter()
        .find(|(path, expected)| match resolve_fact_path(facts, path) {
            Some(actual) => !value_matches(actual, expected),
            None => true,
        })
        .map(|(path, _)| path.as_str())
}

/// Whether every predicate entry matches `facts` (empty predicate matches all)
pub fn facts_match(facts: &Value, predicate: &FactPredicate) -> bool {
    first_mismatch(facts, predicate).is_none()
}

/// Evaluate a single rule against facts
pub fn evaluate_rule(rule: &ClassificationRule, facts: &Value) -> RuleEvaluation {
    let failed_path = first_mismatch(facts, &rule.fact_match).map(str::to_string);
    let matched = failed_path.is_none();

    tracing::debug!(
        "Rule evaluation: rule='{}' priority={} matched={} failed_path={:?}",
        rule.name,
        rule.priority,
        matched,
        failed_path
    );

    RuleEvaluation {
        rule_id: rule.id,
        matched,
        failed_path,
    }
}

/// Enabled rules matching `facts`, highest priority first
///
/// Ties keep their input order.
pub fn matching_rules<'a>(
    facts: &Value,
    rules: &'a [ClassificationRule],
) -> Vec<&'a ClassificationRule> {
    let mut candidates: Vec<&ClassificationRule> = rules.iter().filter(|r| r.enabled).collect();
    // sort_by is stable
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

    candidates
        .into_iter()
        .filter(|rule| evaluate_rule(rule, facts).matched)
        .collect()
}

/// Target group ids of the matching rules, highest priority first
pub fn matching_group_ids(facts: &Value, rules: &[ClassificationRule]) -> Vec<Uuid> {
    matching_rules(facts, rules)
        .into_iter()
        .map(|rule| rule.group_id)
        .collect()
}
