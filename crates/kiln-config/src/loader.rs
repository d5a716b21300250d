//! Configuration Loader
//!
//! Handles loading the global configuration and layering environment
//! overrides on top of it.

use crate::global::GlobalConfig;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
///
/// Loads configuration from multiple sources with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Global config (~/.kiln/config.toml, or `KILN_CONFIG`)
/// 3. Environment variables (KILN_*) - overrides the file
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Explicit config file, bypassing `KILN_CONFIG` and the home directory
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Load from a specific file instead of the default location
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Load the effective configuration
    ///
    /// A missing default config file is not an error; an explicitly named
    /// one (builder or `KILN_CONFIG`) must exist.
    pub fn load(&self) -> ConfigResult<GlobalConfig> {
        let config = match self.explicit_path() {
            Some(path) => GlobalConfig::load_from_file(&path)?,
            None => self.load_default()?,
        };

        let config = Self::apply_env_overrides(config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file and apply env overrides
    pub fn load_from_file(&self, path: &Path) -> ConfigResult<GlobalConfig> {
        let config = GlobalConfig::load_from_file(path)?;
        let config = Self::apply_env_overrides(config)?;
        config.validate()?;
        Ok(config)
    }

    fn explicit_path(&self) -> Option<PathBuf> {
        self.config_path.clone().or_else(|| {
            env::var_os("KILN_CONFIG")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
    }

    fn load_default(&self) -> ConfigResult<GlobalConfig> {
        let path = match GlobalConfig::global_config_path() {
            Ok(path) => path,
            Err(ConfigError::HomeNotFound) => {
                debug!("no home directory, using default configuration");
                return Ok(GlobalConfig::default());
            }
            Err(e) => return Err(e),
        };

        // Global config is optional
        if !path.exists() {
            debug!(path = %path.display(), "global config absent, using defaults");
            return Ok(GlobalConfig::default());
        }

        debug!(path = %path.display(), "loading global config");
        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides
    ///
    /// Recognized: KILN_COMPILER, KILN_INSTALLER, KILN_GENERATOR,
    /// KILN_OPENER, KILN_MINIFY, KILN_PORT
    fn apply_env_overrides(mut config: GlobalConfig) -> ConfigResult<GlobalConfig> {
        if let Ok(compiler) = env::var("KILN_COMPILER") {
            config.toolchain.compiler = compiler;
        }

        if let Ok(installer) = env::var("KILN_INSTALLER") {
            config.toolchain.installer = installer;
        }

        if let Ok(generator) = env::var("KILN_GENERATOR") {
            config.toolchain.generator = generator;
        }

        if let Ok(opener) = env::var("KILN_OPENER") {
            config.toolchain.opener = Some(opener);
        }

        if let Ok(minify) = env::var("KILN_MINIFY") {
            let minify_bool = matches!(minify.to_lowercase().as_str(), "true" | "1" | "yes");
            config.build.minify = Some(minify_bool);
        }

        if let Ok(port) = env::var("KILN_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "KILN_PORT".to_string(),
                reason: format!("'{}' is not a valid port", port),
            })?;
        }

        Ok(config)
    }

    /// Get the global configuration directory (~/.kiln)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".kiln"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
