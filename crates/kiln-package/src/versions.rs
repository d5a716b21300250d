//! Version record (versions.json)

use crate::hash::Hash;
use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-file digests of one built package.
///
/// A path lives in exactly one table: `files_hash` for detached files,
/// `pkgz_files` for files that go into the bundle archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(rename = "filesHash", default)]
    pub files_hash: BTreeMap<String, String>,

    #[serde(rename = "pkgzFiles", default)]
    pub pkgz_files: BTreeMap<String, String>,
}

/// Package-level digests derived from a [`VersionRecord`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageHashes {
    /// Over bundled entries only
    pub pkgz_hash: String,
    /// Bundled entries followed by detached digests
    pub hash: String,
}

impl VersionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file digest in the table its detach status selects.
    pub fn record(&mut self, path: impl Into<String>, digest: impl Into<String>, detached: bool) {
        let path = path.into();
        let digest = digest.into();
        if detached {
            self.pkgz_files.remove(&path);
            self.files_hash.insert(path, digest);
        } else {
            self.files_hash.remove(&path);
            self.pkgz_files.insert(path, digest);
        }
    }

    /// Digest recorded for `path` in either table
    pub fn digest_of(&self, path: &str) -> Option<&str> {
        self.pkgz_files
            .get(path)
            .or_else(|| self.files_hash.get(path))
            .map(String::as_str)
    }

    /// Fold the tables into the package digests.
    ///
    /// Bundled entries are folded in path order as path then digest, giving
    /// `pkgz_hash`. Folding then continues over the detached digests in path
    /// order, giving `hash`.
    pub fn package_hashes(&self) -> PackageHashes {
        let mut hash = Hash::new();
        for (path, digest) in &self.pkgz_files {
            hash.update_str(path);
            hash.update_str(digest);
        }
        let pkgz_hash = hash.digest128();

        for digest in self.files_hash.values() {
            hash.update_str(digest);
        }

        PackageHashes {
            pkgz_hash,
            hash: hash.digest128(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| PackageError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|e| PackageError::io(path, e))
    }
}
