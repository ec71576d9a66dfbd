//! Property-based tests

pub mod merge_proptest;
pub mod query_proptest;
