//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality across all integration tests:
//! - Test fixtures (interpreter settings, paragraphs, config projects)
//! - Custom assertions and polling helpers
//! - A recording application event listener

pub mod assertions;
pub mod fixtures;
pub mod mock_listener;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_listener::*;
