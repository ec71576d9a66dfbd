//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Feed item builders
//! - An in-memory application harness driven through `tower::ServiceExt`
//! - Custom assertion macros

pub mod assertions;
#[cfg(feature = "ssr")]
pub mod test_app;

// Re-export commonly used utilities
pub use fixtures::*;
#[cfg(feature = "ssr")]
pub use test_app::*;
