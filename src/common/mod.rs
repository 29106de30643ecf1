//! Common utilities and shared functionality
//!
//! Collaborator traits, clocks, config loading and small numeric helpers
//! used across the engine.

pub mod clock;
pub mod config;
pub mod traits;
pub mod types;
