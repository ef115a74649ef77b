//! Common test utilities and helpers
//!
//! This module provides shared test infrastructure including:
//! - Hierarchy fixtures
//! - Mock fact sources and hierarchy stores

pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
