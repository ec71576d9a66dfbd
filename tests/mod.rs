//! Test suite for classboard
//!
//! This module organizes all tests

pub mod common;
pub mod property;
