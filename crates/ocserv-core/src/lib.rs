//! Core constants shared across ocserv-quota crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Error kind labels for structured logging
//! - Common project metadata
//! - Process shutdown signal handling

pub mod defaults;
pub mod errors;
pub mod shutdown;

// Re-export commonly used items at crate root
pub use defaults::*;
pub use errors::*;

/// Project name.
pub const PROJECT_NAME: &str = "ocserv-quota";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
