//! Global Configuration (~/.kiln/config.toml)
//!
//! Handles user-level configuration stored in `~/.kiln/config.toml`.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.kiln/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// External tools invoked by the pipelines
    pub toolchain: ToolchainConfig,

    /// Runtime SDK locations used by `export`
    pub sdk: SdkConfig,

    /// Build defaults
    pub build: BuildDefaults,

    /// Dev server settings
    pub server: ServerConfig,
}

/// External tool command lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Compiler invoked as `<compiler> -project .tsconfig.json`
    pub compiler: String,

    /// Dependency installer, run in the project root
    pub installer: String,

    /// Native project generator
    pub generator: String,

    /// Program used to open exported projects (platform default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opener: Option<String>,

    /// Framework runtime launched by `start`
    pub runtime: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: "tsc".to_string(),
            installer: "npm install --only=prod".to_string(),
            generator: "gyp".to_string(),
            opener: None,
            runtime: "quark".to_string(),
        }
    }
}

/// Runtime SDK locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SdkConfig {
    /// Core runtime library project referenced by the umbrella descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_project: Option<PathBuf>,

    /// Extra descriptor files passed to the generator with `-I`
    pub gyp_includes: Vec<PathBuf>,

    /// Header directories staged into `out/usr`
    pub includes: Vec<PathBuf>,

    /// Prebuilt runtime libraries per target OS, staged into `out/usr`
    pub libraries: BTreeMap<String, Vec<PathBuf>>,

    /// Resources bundled with every exported application
    pub bundle_resources: Vec<PathBuf>,

    /// Type declarations copied into `node_modules/@types` after install
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<PathBuf>,

    /// Example project copied by `init examples`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<PathBuf>,
}

/// Build defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildDefaults {
    /// Session-wide minify override; unset defers to each package manifest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,

    /// Skip dot-files and dot-directories while walking packages
    pub ignore_hidden: bool,
}

impl Default for BuildDefaults {
    fn default() -> Self {
        Self {
            minify: None,
            ignore_hidden: true,
        }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Port the debug server listens on
    pub port: u16,

    /// Inspector address handed to the runtime in debug builds
    pub inspect: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 1026,
            inspect: "0.0.0.0:9229".to_string(),
        }
    }
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("toolchain.compiler", &self.toolchain.compiler),
            ("toolchain.installer", &self.toolchain.installer),
            ("toolchain.generator", &self.toolchain.generator),
            ("toolchain.runtime", &self.toolchain.runtime),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "command must not be empty".to_string(),
                });
            }
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }

        for os in self.sdk.libraries.keys() {
            if !matches!(os.as_str(), "ios" | "android" | "mac" | "linux") {
                return Err(ConfigError::InvalidValue {
                    field: format!("sdk.libraries.{}", os),
                    reason: "expected one of ios, android, mac, linux".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the global config file path (~/.kiln/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".kiln").join("config.toml"))
    }

    /// Prebuilt libraries configured for one target OS
    pub fn libraries_for(&self, os: &str) -> &[PathBuf] {
        self.sdk
            .libraries
            .get(os)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Split a configured command line into program and arguments.
///
/// Returns `None` for a blank line.
pub fn split_command(line: &str) -> Option<(String, Vec<String>)> {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_global_config() {
        let toml = r#"
[toolchain]
compiler = "node /opt/sdk/qktsc"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.toolchain.compiler, "node /opt/sdk/qktsc");
        assert_eq!(config.toolchain.generator, "gyp");
        assert_eq!(config.server.port, 1026);
        assert!(config.build.ignore_hidden);
    }

    #[test]
    fn test_parse_full_global_config() {
        let toml = r#"
[toolchain]
compiler = "tsc"
installer = "npm install --only=prod"
generator = "/opt/sdk/gyp.sh"
opener = "xdg-open"

[sdk]
core_project = "/opt/sdk/quark.gyp"
gyp_includes = ["/opt/sdk/quark.gypi"]
includes = ["/opt/sdk/include"]
bundle_resources = ["/opt/sdk/cacert.pem"]

[sdk.libraries]
linux = ["/opt/sdk/linux"]
android = ["/opt/sdk/android"]

[build]
minify = true
ignore_hidden = false

[server]
port = 8080
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.build.minify, Some(true));
        assert_eq!(config.libraries_for("linux"), &[PathBuf::from("/opt/sdk/linux")]);
        assert!(config.libraries_for("ios").is_empty());
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[toolchain]
compilr = "tsc"
"#;
        assert!(toml::from_str::<GlobalConfig>(toml).is_err());
    }

    #[test]
    fn test_invalid_library_os() {
        let mut config = GlobalConfig::default();
        config
            .sdk
            .libraries
            .insert("windows".to_string(), vec![PathBuf::from("/x")]);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_command_rejected() {
        let mut config = GlobalConfig::default();
        config.toolchain.generator = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("npm install --only=prod"),
            Some((
                "npm".to_string(),
                vec!["install".to_string(), "--only=prod".to_string()]
            ))
        );
        assert_eq!(split_command("   "), None);
    }
}
