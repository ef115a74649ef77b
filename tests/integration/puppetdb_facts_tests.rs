//! Fact lookups against a mock PuppetDB server

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use openvox_enc::config::PuppetDbConfig;
use openvox_enc::services::{
    ClassificationService, ClassificationStrategy, FactProvider, PuppetDbClient,
    PuppetDbFactProvider,
};
use openvox_enc::EncError;

use crate::common::*;

const FACTS_PATH: &str = "/pdb/query/v4/facts";

fn certname_query(certname: &str) -> String {
    format!(r#"["=","certname","{}"]"#, certname)
}

fn client(server: &MockServer) -> PuppetDbClient {
    PuppetDbClient::new(&PuppetDbConfig::new(server.uri())).unwrap()
}

async fn mount_facts(server: &MockServer, certname: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(FACTS_PATH))
        .and(query_param("query", certname_query(certname)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_node_facts_are_folded_into_a_map() {
    let server = MockServer::start().await;
    mount_facts(
        &server,
        "web1.example.com",
        json!([
            {"certname": "web1.example.com", "name": "os", "value": {"family": "RedHat"}, "environment": "production"},
            {"certname": "web1.example.com", "name": "kernel", "value": "Linux", "environment": "production"}
        ]),
    )
    .await;

    let provider = PuppetDbFactProvider::new(client(&server));
    let facts = provider.facts("web1.example.com").await.unwrap().unwrap();

    assert_eq!(facts["os"]["family"], "RedHat");
    assert_eq!(facts["kernel"], "Linux");
}

#[tokio::test]
async fn test_unknown_node_has_no_facts() {
    let server = MockServer::start().await;
    mount_facts(&server, "ghost.example.com", json!([])).await;

    let provider = PuppetDbFactProvider::new(client(&server));
    assert!(provider.facts("ghost.example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_is_a_fact_source_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FACTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_node_facts("web1.example.com")
        .await
        .unwrap_err();
    match err {
        EncError::FactSource(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("boom"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_response_is_truncated_in_error() {
    let server = MockServer::start().await;
    let garbage = "x".repeat(2000);
    Mock::given(method("GET"))
        .and(path(FACTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(garbage))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_node_facts("web1.example.com")
        .await
        .unwrap_err();
    match err {
        EncError::FactSource(msg) => {
            assert!(msg.contains("(truncated)"));
            assert!(msg.len() < 1000);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_puppetdb_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FACTS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = PuppetDbConfig::new(server.uri());
    config.timeout_secs = 1;
    let client = PuppetDbClient::new(&config).unwrap();

    let err = client.get_node_facts("web1.example.com").await.unwrap_err();
    assert!(matches!(err, EncError::Timeout(_)));
}

#[tokio::test]
async fn test_classification_with_puppetdb_facts() {
    let server = MockServer::start().await;
    mount_facts(
        &server,
        "rhel1.example.com",
        json!([
            {"certname": "rhel1.example.com", "name": "os", "value": {"family": "CentOS"}, "environment": "production"}
        ]),
    )
    .await;

    let store = seeded_store().await;
    let service = ClassificationService::new(
        store,
        Arc::new(PuppetDbFactProvider::new(client(&server))),
    )
    .with_strategy(ClassificationStrategy::FactRules);

    let report = service.explain("rhel1.example.com").await.unwrap();
    assert!(report.facts_available);
    assert_eq!(report.classification.classes["yum"]["gpgcheck"], true);
}
