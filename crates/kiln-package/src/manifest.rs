//! Package manifest (package.json)
//!
//! Only the keys the pipelines act on are typed. Everything else is kept in
//! [`PackageManifest::extra`] and written back untouched.

use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Path prefixes that never enter a build, in addition to a manifest's own `skip`.
pub const DEFAULT_SKIP: &[&str] = &[
    "tsconfig.json",
    "binding.gyp",
    "versions.json",
    "package-lock.json",
    "out",
    "project",
];

/// Nested-module tree: directory path -> output name -> manifest
pub type ModuleTree = BTreeMap<String, BTreeMap<String, PackageManifest>>;

/// Package manifest (package.json)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,

    /// Package identity digest; present once a package has been built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Digest over the bundled files only
    #[serde(default, rename = "pkgzHash", skip_serializing_if = "Option::is_none")]
    pub pkgz_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, String>>,

    /// Path prefixes recorded in `filesHash` and left out of the bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detach: Option<PathList>,

    /// Path prefixes excluded from the build entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<PathList>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,

    #[serde(default, rename = "skipInstall", skip_serializing_if = "Option::is_none")]
    pub skip_install: Option<SkipInstall>,

    /// Bundle identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Relative path to the shared build (nested-module records only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<ModuleTree>,

    /// Outer files copied into the output trees: source -> target ("" keeps the name)
    #[serde(default, rename = "@copy", skip_serializing_if = "Option::is_none")]
    pub copy: Option<BTreeMap<String, String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A string or a list of strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PathList {
    One(String),
    Many(Vec<String>),
}

impl PathList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            PathList::One(s) => vec![s.clone()],
            PathList::Many(v) => v.clone(),
        }
    }
}

/// How much of a package is kept out of the distributable tree.
///
/// Serialized as the integers 0, 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SkipInstall {
    #[default]
    None,
    /// This package only
    SelfOnly,
    /// This package and every dependency below it
    All,
}

impl SkipInstall {
    /// Level a dependency builds with, given its parent's level.
    pub fn inherit(parent: SkipInstall, own: SkipInstall) -> SkipInstall {
        if parent == SkipInstall::All {
            SkipInstall::All
        } else {
            own
        }
    }

    pub fn is_set(self) -> bool {
        self != SkipInstall::None
    }
}

impl TryFrom<u8> for SkipInstall {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(SkipInstall::None),
            1 => Ok(SkipInstall::SelfOnly),
            2 => Ok(SkipInstall::All),
            other => Err(format!("skipInstall must be 0, 1 or 2, got {}", other)),
        }
    }
}

impl From<SkipInstall> for u8 {
    fn from(value: SkipInstall) -> u8 {
        match value {
            SkipInstall::None => 0,
            SkipInstall::SelfOnly => 1,
            SkipInstall::All => 2,
        }
    }
}

impl PackageManifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            hash: None,
            pkgz_hash: None,
            dependencies: None,
            detach: None,
            skip: None,
            minify: None,
            skip_install: None,
            id: None,
            app: None,
            symlink: None,
            modules: None,
            copy: None,
            extra: Map::new(),
        }
    }

    /// Parse manifest from a JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
        Self::from_str(&content).map_err(|e| PackageError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Serialize as two-space indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write to `path`, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PackageError::io(parent, e))?;
        }
        std::fs::write(path, json).map_err(|e| PackageError::io(path, e))
    }

    /// `name@version`
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Manifest `skip` prefixes followed by [`DEFAULT_SKIP`]
    pub fn skip_prefixes(&self) -> Vec<String> {
        let mut prefixes = self.skip.as_ref().map(PathList::to_vec).unwrap_or_default();
        prefixes.extend(DEFAULT_SKIP.iter().map(|s| s.to_string()));
        prefixes
    }

    pub fn detach_prefixes(&self) -> Vec<String> {
        self.detach.as_ref().map(PathList::to_vec).unwrap_or_default()
    }

    pub fn skip_install_level(&self) -> SkipInstall {
        self.skip_install.unwrap_or_default()
    }

    /// Drop the build-only directives before the manifest is published.
    pub fn strip_build_directives(&mut self) {
        self.skip = None;
        self.detach = None;
    }

    /// Iterate dependencies in name order
    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .flat_map(|deps| deps.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_manifest() {
        let manifest = PackageManifest::from_str(r#"{"name": "app", "version": "1.0.0"}"#).unwrap();
        assert_eq!(manifest.name, "app");
        assert_eq!(manifest.version, "1.0.0");
        assert!(manifest.hash.is_none());
        assert_eq!(manifest.skip_install_level(), SkipInstall::None);
    }

    #[test]
    fn test_missing_version_is_error() {
        assert!(PackageManifest::from_str(r#"{"name": "app"}"#).is_err());
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let src = r#"{
  "name": "app",
  "version": "1.0.0",
  "main": "index.js",
  "scripts": {"start": "kiln start"}
}"#;
        let manifest = PackageManifest::from_str(src).unwrap();
        assert_eq!(manifest.extra.get("main"), Some(&Value::from("index.js")));

        let out = manifest.to_json_pretty().unwrap();
        let reparsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(reparsed["scripts"]["start"], "kiln start");
    }

    #[test]
    fn test_skip_and_detach_accept_string_or_list() {
        let manifest = PackageManifest::from_str(
            r#"{"name": "a", "version": "1.0.0", "skip": "docs", "detach": ["res/", "big.bin"]}"#,
        )
        .unwrap();

        let skips = manifest.skip_prefixes();
        assert_eq!(skips[0], "docs");
        assert!(skips.contains(&"binding.gyp".to_string()));
        assert_eq!(manifest.detach_prefixes(), vec!["res/", "big.bin"]);
    }

    #[test]
    fn test_strip_build_directives() {
        let mut manifest = PackageManifest::from_str(
            r#"{"name": "a", "version": "1.0.0", "skip": "docs", "detach": "res"}"#,
        )
        .unwrap();
        manifest.strip_build_directives();

        let out = manifest.to_json_pretty().unwrap();
        assert!(!out.contains("skip"));
        assert!(!out.contains("detach"));
    }

    #[test]
    fn test_skip_install_levels() {
        let manifest =
            PackageManifest::from_str(r#"{"name": "a", "version": "1.0.0", "skipInstall": 2}"#)
                .unwrap();
        assert_eq!(manifest.skip_install_level(), SkipInstall::All);

        assert!(
            PackageManifest::from_str(r#"{"name": "a", "version": "1.0.0", "skipInstall": 3}"#)
                .is_err()
        );

        assert_eq!(
            SkipInstall::inherit(SkipInstall::All, SkipInstall::None),
            SkipInstall::All
        );
        assert_eq!(
            SkipInstall::inherit(SkipInstall::SelfOnly, SkipInstall::None),
            SkipInstall::None
        );
    }

    #[test]
    fn test_copy_key_renamed() {
        let manifest = PackageManifest::from_str(
            r#"{"name": "a", "version": "1.0.0", "@copy": {"assets/logo.png": ""}}"#,
        )
        .unwrap();
        let copy = manifest.copy.unwrap();
        assert_eq!(copy.get("assets/logo.png").map(String::as_str), Some(""));
    }

    #[test]
    fn test_module_tree_round_trip() {
        let mut child = PackageManifest::new("libx", "2.0.0");
        child.symlink = Some("../../node_modules/libx@2.0.0".to_string());

        let mut dir = BTreeMap::new();
        dir.insert("libx@2.0.0".to_string(), child);
        let mut tree = ModuleTree::new();
        tree.insert("node_modules".to_string(), dir);

        let mut root = PackageManifest::new("app", "1.0.0");
        root.modules = Some(tree.clone());

        let parsed = PackageManifest::from_str(&root.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed.modules, Some(tree));
    }
}
