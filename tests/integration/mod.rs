//! Integration tests for OpenVox ENC
//!
//! These tests exercise the classifier end to end against a seeded
//! in-memory hierarchy, mock fact sources and a mock PuppetDB server.

mod classification_tests;
mod puppetdb_facts_tests;
