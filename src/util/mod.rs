//! Utility modules

pub mod logging;

pub use logging::{init_tracing, DEVCONSOLE_TARGET, DIAGNOSTICS_TARGET};
