//! Kiln Configuration System
//!
//! Provides the user-level configuration consumed by the build and export
//! pipelines:
//! - Toolchain commands (compiler, dependency installer, project generator)
//! - SDK locations (core runtime project, generator includes, per-OS libraries)
//! - Build defaults (minify override, hidden-file handling)
//! - Dev server settings
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config (~/.kiln/config.toml, or the file named by `KILN_CONFIG`)
//! 3. Environment variables (KILN_*)
//! 4. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use kiln_config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load().unwrap();
//! println!("compiler: {}", config.toolchain.compiler);
//! ```

pub mod global;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::{
    split_command, BuildDefaults, GlobalConfig, SdkConfig, ServerConfig, ToolchainConfig,
};
pub use loader::ConfigLoader;
