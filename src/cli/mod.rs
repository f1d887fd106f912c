//! CLI-specific functionality for the hot exit snapshot tool
//!
//! This module contains all CLI-related code including argument parsing,
//! snapshot summaries, and configuration discovery.

pub mod args;
pub mod config;
pub mod inspect;

pub use args::{Args, Commands, ExecutionMode};
pub use config::ConfigDiscovery;
pub use inspect::SessionSummary;
