//! Generator descriptor documents
//!
//! Per-package `out/<name>.gypi`, the umbrella `<name>.gyp` and
//! `out/var.gypi`. All are written as pretty JSON, which the generator reads
//! as a Python literal.

use crate::error::{ExportError, ExportResult};
use kiln_build::fsutil;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Executable,
    StaticLibrary,
    SharedLibrary,
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependentSettings {
    pub include_dirs: Vec<String>,
}

/// One build target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,
    pub target_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: TargetType,
    pub include_dirs: Vec<String>,
    pub dependencies: Vec<String>,
    pub direct_dependent_settings: DependentSettings,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_bundle: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_bundle_resources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xcode_settings: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldflags: Option<Vec<String>>,
}

impl Target {
    pub fn new(name: impl Into<String>, kind: TargetType) -> Self {
        Self {
            variables: None,
            target_name: name.into(),
            product_name: None,
            kind,
            include_dirs: Vec::new(),
            dependencies: Vec::new(),
            direct_dependent_settings: DependentSettings::default(),
            sources: Vec::new(),
            mac_bundle: None,
            mac_bundle_resources: None,
            xcode_settings: None,
            ldflags: None,
        }
    }
}

/// Contents of a package `.gypi`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmbrellaVariables {
    pub libquark: Vec<String>,
}

/// Project-level `<name>.gyp` pulling in every package descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmbrellaGyp {
    pub variables: UmbrellaVariables,
    pub includes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformVariables {
    #[serde(rename = "OS")]
    pub os_upper: String,
    pub os: String,
    pub style: String,
    #[serde(rename = "DEPTH")]
    pub depth: String,
}

/// `out/var.gypi`, passed to the generator with `-I`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarGypi {
    pub variables: PlatformVariables,
}

impl VarGypi {
    pub fn new(os: &str, style: &str, depth: &Path) -> Self {
        Self {
            variables: PlatformVariables {
                os_upper: os.to_string(),
                os: os.to_string(),
                style: style.to_string(),
                depth: fsutil::to_slash(depth),
            },
        }
    }
}

/// Serialize `doc` as pretty JSON to `path`
pub fn write_json<T: Serialize>(path: &Path, doc: &T) -> ExportResult<()> {
    let body = serde_json::to_string_pretty(doc).map_err(|e| ExportError::config(path, e))?;
    fsutil::write_file(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_library_target_shape() {
        let mut target = Target::new("libx@2.0.0", TargetType::StaticLibrary);
        target.include_dirs = vec!["../node_modules/libx".to_string()];
        target.direct_dependent_settings.include_dirs = target.include_dirs.clone();
        target.sources = vec!["../node_modules/libx/x.cc".to_string()];
        target.ldflags = Some(vec!["${LDFLAGS}".to_string()]);

        let value = serde_json::to_value(Descriptor { targets: vec![target] }).unwrap();
        assert_eq!(
            value,
            json!({
                "targets": [{
                    "target_name": "libx@2.0.0",
                    "type": "static_library",
                    "include_dirs": ["../node_modules/libx"],
                    "dependencies": [],
                    "direct_dependent_settings": { "include_dirs": ["../node_modules/libx"] },
                    "sources": ["../node_modules/libx/x.cc"],
                    "ldflags": ["${LDFLAGS}"]
                }]
            })
        );
    }

    #[test]
    fn test_var_gypi_keys() {
        let value = serde_json::to_value(VarGypi::new("android", "cmake-linux", Path::new("/p"))).unwrap();
        assert_eq!(
            value,
            json!({ "variables": { "OS": "android", "os": "android", "style": "cmake-linux", "DEPTH": "/p" } })
        );
    }
}
