//! HTTP API integration tests

pub mod feed_test;
pub mod live_test;
