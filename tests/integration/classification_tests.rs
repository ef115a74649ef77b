//! Classification against the fixture hierarchy

use std::sync::Arc;

use serde_json::json;

use openvox_enc::db::HierarchyStore;
use openvox_enc::models::LayerKind;
use openvox_enc::services::{render, ClassificationService, ClassificationStrategy, NoFacts};

use crate::common::*;

#[tokio::test]
async fn test_registered_node_full_stack() {
    let store = seeded_store().await;
    let service = ClassificationService::new(store, Arc::new(NoFacts));

    let classification = service.resolve("web1.example.com").await.unwrap();
    assert_eq!(classification.environment, "production");
    assert_eq!(classification.classes["nginx"]["workers"], 16);
    assert_eq!(
        classification.classes["profile::base"]["motd"],
        "Managed by OpenVox"
    );
    assert_eq!(classification.parameters["datacenter"], "eu-1");
    assert_eq!(classification.parameters["stage"], "prod");
    assert_eq!(classification.parameters["role"], "web");
}

#[tokio::test]
async fn test_node_environment_and_sorted_groups() {
    let store = seeded_store().await;
    let service = ClassificationService::new(store, Arc::new(NoFacts));

    let report = service.explain("mixed1.example.com").await.unwrap();
    let classification = &report.classification;
    assert_eq!(classification.environment, "staging");
    assert_eq!(
        classification.classes["ntp"]["servers"],
        json!(["ntp.staging.example.com"])
    );
    assert_eq!(classification.parameters["stage"], "staging");
    // databases < webservers, so webservers wins
    assert_eq!(classification.parameters["role"], "web");
    assert!(classification.classes.contains_key("postgresql"));

    let groups: Vec<&str> = report
        .layers
        .iter()
        .filter(|l| l.kind == LayerKind::Group)
        .map(|l| l.name.as_str())
        .collect();
    assert_eq!(groups, vec!["databases", "webservers"]);
}

#[tokio::test]
async fn test_unregistered_node_yaml_shape() {
    let store = seeded_store().await;
    let service = ClassificationService::new(store, Arc::new(NoFacts));

    let classification = service.resolve("ghost.example.com").await.unwrap();
    assert_eq!(classification.environment, "production");
    assert!(!classification.classes.contains_key("nginx"));

    let yaml = render::to_yaml(&classification).unwrap();
    assert!(yaml.starts_with("classes:\n"));
    assert!(yaml.contains("\nenvironment: production\n"));
    assert!(!yaml.contains('&'));
}

#[tokio::test]
async fn test_fact_rules_for_unregistered_node() {
    let store = seeded_store().await;
    let facts = Arc::new(MockFactSource::new());
    facts.add_facts("rhel1.example.com", redhat_facts());
    facts.add_facts("big1.example.com", big_debian_facts());

    let service = ClassificationService::new(store, facts.clone())
        .with_strategy(ClassificationStrategy::FactRules);

    let rhel = service.resolve("rhel1.example.com").await.unwrap();
    assert_eq!(rhel.classes["yum"]["gpgcheck"], true);
    assert!(!rhel.classes.contains_key("postgresql"));

    let big = service.resolve("big1.example.com").await.unwrap();
    assert_eq!(big.classes["postgresql"]["version"], "15");
    assert!(!big.classes.contains_key("yum"));

    assert_eq!(facts.calls(), 2);
}

#[tokio::test]
async fn test_hierarchical_strategy_never_asks_for_facts() {
    let store = seeded_store().await;
    let facts = Arc::new(MockFactSource::new());
    facts.add_facts("rhel1.example.com", redhat_facts());

    let service = ClassificationService::new(store, facts.clone());
    let classification = service.resolve("rhel1.example.com").await.unwrap();

    assert!(!classification.classes.contains_key("yum"));
    assert_eq!(facts.calls(), 0);
}

#[tokio::test]
async fn test_caller_supplied_facts() {
    let store = seeded_store().await;
    let service = ClassificationService::new(store, Arc::new(NoFacts))
        .with_strategy(ClassificationStrategy::FactRules);

    let classification = service
        .resolve_with_facts("rhel1.example.com", Some(object(redhat_facts())))
        .await
        .unwrap();
    assert_eq!(classification.parameters["pkg_provider"], "yum");
}

#[tokio::test]
async fn test_writes_are_visible_to_next_resolution() {
    let store = seeded_store().await;
    let service = ClassificationService::new(store.clone(), Arc::new(NoFacts));

    let before = service.resolve("web1.example.com").await.unwrap();
    assert_eq!(before.parameters["role"], "web");

    let group = store.get_group_by_name("webservers").await.unwrap().unwrap();
    store.delete_group(group.id).await.unwrap();

    let after = service.resolve("web1.example.com").await.unwrap();
    assert!(!after.parameters.contains_key("role"));
    assert_eq!(after.classes["nginx"]["workers"], 16);
}

#[tokio::test]
async fn test_concurrent_resolutions_agree() {
    let store = seeded_store().await;
    let service = ClassificationService::new(store, Arc::new(NoFacts));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.resolve("mixed1.example.com").await.unwrap() })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}
