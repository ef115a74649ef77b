//! Classification rule step definitions

use crate::features::support::{parse_value, TestWorld};
use cucumber::given;
use openvox_enc::db::HierarchyStore;
use openvox_enc::models::SaveRuleRequest;
use openvox_enc::services::ClassificationStrategy;
use serde_json::Map;

#[given(expr = "the classification strategy is {string}")]
async fn strategy(world: &mut TestWorld, name: String) {
    world.strategy = ClassificationStrategy::parse(&name)
        .unwrap_or_else(|| panic!("unknown strategy {}", name));
}

#[given(expr = "a rule {string} with priority {int} matching {string} = {string} targets group {string}")]
async fn create_rule(
    world: &mut TestWorld,
    name: String,
    priority: i32,
    path: String,
    expected: String,
    group: String,
) {
    let group = world
        .store
        .get_group_by_name(&group)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("group {} does not exist", group));

    let mut fact_match = Map::new();
    if !path.is_empty() {
        fact_match.insert(path, parse_value(&expected));
    }

    world
        .store
        .save_rule(
            None,
            SaveRuleRequest {
                name,
                description: None,
                priority,
                fact_match,
                group_id: group.id,
                enabled: true,
            },
        )
        .await
        .unwrap();
}

#[given(expr = "rule {string} is disabled")]
async fn disable_rule(world: &mut TestWorld, name: String) {
    let rule = world
        .store
        .list_rules()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("rule {} does not exist", name));

    world
        .store
        .save_rule(
            Some(rule.id),
            SaveRuleRequest {
                name: rule.name,
                description: rule.description,
                priority: rule.priority,
                fact_match: rule.fact_match,
                group_id: rule.group_id,
                enabled: false,
            },
        )
        .await
        .unwrap();
}
