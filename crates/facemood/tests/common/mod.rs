//! Shared utilities for facemood integration tests.
//!
//! - `TestHarness` owns a temp directory, the file-backed store and the
//!   settings both services are built from
//! - fixtures build images and a deterministic face model

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::TestHarness;
