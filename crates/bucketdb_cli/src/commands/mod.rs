//! CLI command implementations.

pub mod script;
pub mod trace;
