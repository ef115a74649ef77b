//! OpenVox ENC Library
//!
//! Hierarchical external node classification for OpenVox/Puppet: common,
//! environment, group and node layers deep-merged into one classification,
//! optionally extended with fact-matching classification rules.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::{HierarchyStore, InMemoryStore};
pub use models::Classification;
pub use services::{ClassificationService, ClassificationStrategy};
pub use utils::{EncError, EncResult};
