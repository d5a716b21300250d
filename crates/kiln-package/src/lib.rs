//! Kiln package model
//!
//! The `package.json` manifest, the `versions.json` version record, the
//! content hash both are keyed on, manifest validation, and the dependency
//! matching used when exporting native projects.

pub mod hash;
pub mod manifest;
pub mod resolver;
pub mod validator;
pub mod versions;

pub use hash::{hash_bytes, hash_reader, Hash, HashingWriter, CHUNK_SIZE};
pub use manifest::{ModuleTree, PackageManifest, PathList, SkipInstall, DEFAULT_SKIP};
pub use resolver::{resolve_dependencies, strip_range_prefix, transitive_closure};
pub use validator::{ValidationError, Validator};
pub use versions::{PackageHashes, VersionRecord};

use std::path::PathBuf;

/// Package management errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("IO error at {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackageError::IoError {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
