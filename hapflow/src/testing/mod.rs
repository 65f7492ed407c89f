//! Testing utilities for hapflow pipelines.
//!
//! This module provides:
//! - A recording tool runner that never launches processes
//! - Fixtures for inputs, stores and tool sets

mod fixtures;
mod mocks;

pub use fixtures::{seeded_store, test_config, tool_set, TEST_BAM, TEST_REFERENCE};
pub use mocks::{invocation_label, RecordingToolRunner};
