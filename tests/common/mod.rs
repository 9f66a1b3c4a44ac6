//! Shared test utilities for the playground
//!
//! - Controller setup with deterministic configuration
//! - Helpers to run a snippet to completion and read its transcript

pub mod harness;
