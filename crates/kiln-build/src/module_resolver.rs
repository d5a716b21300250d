//! Dependency discovery during a build
//!
//! When the walk reaches a `node_modules` directory, every child package is
//! resolved to an output name, built once per session, and reported back so
//! the parent can write its link records.

use crate::builder::PackageBuild;
use crate::error::{BuildError, BuildResult};
use crate::session::{BuildSession, SEARCH_MODULES};
use kiln_package::{PackageManifest, SkipInstall};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Type declarations are never built
const TYPES_DIR: &str = "@types";

/// Where a resolved dependency came from, as seen by the package holding it
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub name: String,
    pub output_name: String,
    /// Manifest of the registered build, or the raw one while it is still building
    pub manifest: PackageManifest,
    /// False only for the session root's top-level dependencies
    pub needs_link: bool,
}

/// Output name of a dependency.
///
/// The session root's own `node_modules` children keep their bare name; any
/// deeper dependency is qualified as `name@version`.
pub fn output_name(manifest: &PackageManifest, root_level: bool) -> String {
    if root_level {
        manifest.name.clone()
    } else {
        manifest.full_name()
    }
}

/// Package directories directly below `dir`, sorted by name.
///
/// Scope directories (`@scope/pkg`) are searched one level deeper.
pub fn package_dirs(dir: &Path) -> BuildResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in child_dirs(dir)? {
        if entry.join("package.json").is_file() {
            found.push(entry);
        } else if is_scope(&entry) {
            found.extend(
                child_dirs(&entry)?
                    .into_iter()
                    .filter(|p| p.join("package.json").is_file()),
            );
        }
    }
    Ok(found)
}

fn is_scope(dir: &Path) -> bool {
    dir.file_name()
        .map(|n| n.to_string_lossy().starts_with('@'))
        .unwrap_or(false)
}

fn child_dirs(dir: &Path) -> BuildResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BuildError::io(dir, io::Error::from(e)))?;
        if entry.file_type().is_dir() && entry.file_name() != TYPES_DIR {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Build (at most once per session) every package in a `node_modules` directory.
///
/// `dir_rel` is the directory's path inside the parent package. Dependencies
/// inherit the parent's skip-install level when it covers the whole subtree.
pub(crate) fn resolve_node_modules(
    session: &mut BuildSession,
    parent_is_session_root: bool,
    parent_skip: SkipInstall,
    dir_rel: &str,
    dir: &Path,
) -> BuildResult<Vec<ResolvedModule>> {
    let root_level = parent_is_session_root && dir_rel == SEARCH_MODULES;
    let mut resolved = Vec::new();

    for pkg_dir in package_dirs(dir)? {
        let manifest = PackageManifest::from_file(&pkg_dir.join("package.json"))?;
        let out = output_name(&manifest, root_level);

        if session.begin(&out) {
            let skip = SkipInstall::inherit(parent_skip, manifest.skip_install_level());
            let rel_dir = format!("{}/{}", SEARCH_MODULES, out);
            let node = PackageBuild::new(session, pkg_dir, rel_dir, out.clone(), manifest.clone(), skip, false)
                .run(session)?;
            session.register(node);
        } else {
            debug!(package = %out, "already built in this session");
        }

        let manifest = session
            .node(&out)
            .map(|node| node.manifest.clone())
            .unwrap_or(manifest);
        resolved.push(ResolvedModule {
            name: manifest.name.clone(),
            output_name: out,
            manifest,
            needs_link: !root_level,
        });
    }

    Ok(resolved)
}
