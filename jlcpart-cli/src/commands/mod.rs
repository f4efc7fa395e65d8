//! CLI command implementations.

pub mod common;
pub mod config;
pub mod fetch;
pub mod install;
pub mod status;
pub mod update;
