//! Integration tests for discovery and harvesting
//!
//! These tests use wiremock to stand in for the target site and run the
//! frontier builder and coordinator end-to-end against it.

mod common;
mod discovery_tests;
mod harvest_tests;
