//! Common layer and environment step definitions

use crate::features::support::{parse_value, set_class_parameter, TestWorld};
use cucumber::given;
use openvox_enc::db::HierarchyStore;

#[given("an empty hierarchy")]
async fn empty_hierarchy(world: &mut TestWorld) {
    *world = TestWorld::default();
}

#[given(expr = "the common layer has parameter {string} set to {string}")]
async fn common_parameter(world: &mut TestWorld, key: String, value: String) {
    world
        .update_common(|req| {
            req.parameters.insert(key, parse_value(&value));
        })
        .await;
}

#[given(expr = "the common layer has class {string} with parameter {string} set to {string}")]
async fn common_class(world: &mut TestWorld, class: String, key: String, value: String) {
    world
        .update_common(|req| {
            set_class_parameter(&mut req.classes, &class, &key, parse_value(&value))
        })
        .await;
}

#[given(expr = "an environment {string}")]
async fn environment(world: &mut TestWorld, name: String) {
    world.update_environment(&name, |_| {}).await;
}

#[given(expr = "environment {string} has parameter {string} set to {string}")]
async fn environment_parameter(world: &mut TestWorld, name: String, key: String, value: String) {
    world
        .update_environment(&name, |req| {
            req.parameters.insert(key, parse_value(&value));
        })
        .await;
}

#[given(expr = "environment {string} has class {string} with parameter {string} set to {string}")]
async fn environment_class(
    world: &mut TestWorld,
    name: String,
    class: String,
    key: String,
    value: String,
) {
    world
        .update_environment(&name, |req| {
            set_class_parameter(&mut req.classes, &class, &key, parse_value(&value))
        })
        .await;
}

#[given(expr = "environment {string} is deleted")]
async fn delete_environment(world: &mut TestWorld, name: String) {
    world.store.delete_environment(&name).await.unwrap();
}
