//! Resolve Bridge Common Utilities
//!
//! Shared infrastructure for all bridge crates:
//! - Error types and result aliases
//! - Timecode parsing and frame arithmetic
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod timecode;

pub use config::*;
pub use error::*;
pub use timecode::*;
