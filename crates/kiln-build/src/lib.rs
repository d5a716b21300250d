//! Kiln package build pipeline
//!
//! Turns a project tree and its `node_modules` dependencies into:
//! - a full output tree (`target/build`) with every package, version record
//!   and `.pkgz` bundle,
//! - a distributable tree (`target/small`) without bundles or skip-install
//!   packages,
//! - compiler declarations under `target/types`.
//!
//! Each dependency is built once per session and linked from wherever else
//! it appears.

pub mod builder;
pub mod bundle;
pub mod classify;
pub mod error;
pub mod fsutil;
pub mod keys;
pub mod lenient;
pub mod minify;
pub mod module_resolver;
pub mod session;
pub mod toolchain;

// Re-export main types
pub use builder::{BuildConfig, BuildOutcome, Builder};
pub use bundle::{bundle_file_name, list_bundle, unpack_bundle, write_bundle, VERSIONS_FILE};
pub use classify::{classify, FileClass};
pub use error::{BuildError, BuildResult};
pub use keys::{KeysDocument, KeysError, KeysValue};
pub use minify::{Minifier, MinifyError, StripMinifier};
pub use module_resolver::{output_name, ResolvedModule};
pub use session::{BuildSession, BuildStats, PackageNode, SEARCH_MODULES};
pub use toolchain::{compile_package, install_dependencies, CompileRequest, ToolCommand, ToolOutput};

// Re-export kiln-package types for convenience
pub use kiln_package::{PackageManifest, VersionRecord};
