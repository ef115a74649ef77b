//! Business logic services

pub mod classification;
pub mod fact_path;
pub mod facts;
pub mod merge;
pub mod puppetdb;
pub mod render;
pub mod rules;

pub use classification::{ClassificationService, ClassificationStrategy};
pub use facts::{FactProvider, NoFacts, PuppetDbFactProvider, StaticFactProvider};
pub use merge::{deep_merge, merge_all};
pub use puppetdb::{PuppetDbClient, QueryBuilder};
pub use rules::{evaluate_rule, facts_match, matching_group_ids, matching_rules, RuleEvaluation};
