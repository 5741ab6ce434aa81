//! Common test utilities for agenda-get integration tests

#[allow(dead_code)]
pub mod fixtures;

pub use fixtures::*;
