//! Integration tests for the playground
//!
//! These tests drive whole runs through the session controller and the
//! widget driver.

#[path = "../common/mod.rs"]
pub mod common;

pub mod errors;
pub mod ordering;
pub mod rendering;
pub mod supersession;
pub mod widget_flow;
