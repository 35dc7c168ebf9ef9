//! CLI command implementations.

pub mod candidates;
mod common;
pub mod fill;
pub mod match_cmd;
pub mod scan;
pub mod settings;
pub mod sheets;
