//! Packages taking part in an export

use crate::error::{ExportError, ExportResult};
use crate::gyp::{self, BINDING_GYP};
use kiln_build::classify::{is_native_header, is_native_source};
use kiln_build::module_resolver::package_dirs;
use kiln_build::{fsutil, SEARCH_MODULES};
use kiln_package::PackageManifest;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Entries never listed as sources, at any depth
const SKIP_SOURCE: &[&str] = &["out", "project", "package-lock.json"];

/// Result of walking one package directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceScan {
    /// Files listed in the descriptor, relative to the export output directory
    pub sources: Vec<String>,
    /// Native sources compiled straight into the package target
    pub binding: bool,
    /// Any native source or header was found
    pub has_native_files: bool,
    /// Dependency on the first target of the package's `binding.gyp`
    pub binding_gyp: Option<String>,
    /// Package directories under `node_modules`
    pub nested: Vec<PathBuf>,
}

/// Walk `package_dir` the way the generator will see it.
///
/// `project_root` anchors the `binding.gyp` dependency path and `output`
/// anchors source paths.
pub fn scan_package(
    package_dir: &Path,
    manifest: &PackageManifest,
    project_root: &Path,
    output: &Path,
) -> ExportResult<SourceScan> {
    let mut scan = SourceScan::default();

    let binding_path = package_dir.join(BINDING_GYP);
    if binding_path.is_file() {
        if let Some(target) = gyp::first_target_name(&binding_path)? {
            scan.binding_gyp = Some(format!(
                "{}/{}:{}",
                fsutil::relative_slash(project_root, package_dir),
                BINDING_GYP,
                target
            ));
        }
    }

    let own_gyp = format!("{}.gyp", manifest.name);
    let relative_source = fsutil::relative_slash(output, package_dir);

    let mut walker = WalkDir::new(package_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !(name.starts_with('.') || SKIP_SOURCE.contains(&name.as_ref()) || name == own_gyp)
        });

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| package_dir.to_path_buf());
            ExportError::io(path, io::Error::from(e))
        })?;
        if entry.depth() == 0 {
            continue;
        }

        if entry.file_type().is_dir() {
            if entry.file_name() == SEARCH_MODULES {
                scan.nested.extend(package_dirs(entry.path())?);
                walker.skip_current_dir();
            }
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(package_dir)
            .map(fsutil::to_slash)
            .map_err(|e| ExportError::io(entry.path(), io::Error::new(io::ErrorKind::Other, e)))?;
        let listed = format!("{}/{}", relative_source, rel);

        if is_native_source(&rel) {
            scan.has_native_files = true;
            if scan.binding_gyp.is_none() {
                scan.binding = true;
                scan.sources.push(listed);
            }
        } else {
            if is_native_header(&rel) {
                scan.has_native_files = true;
            }
            scan.sources.push(listed);
        }
    }

    Ok(scan)
}

/// One package in the export graph
#[derive(Debug, Clone)]
pub struct ExportPackageNode {
    pub source_dir: PathBuf,
    pub output_name: String,
    pub manifest: PackageManifest,
    pub is_app: bool,
    /// Descriptor path, `out/<output_name>.gypi`
    pub gypi_path: PathBuf,
    pub sources: Vec<String>,
    pub include_dirs: Vec<String>,
    /// Direct dependencies, plus the native descriptor target if any
    pub dependencies: Vec<String>,
    /// Everything the application links, transitively
    pub dependencies_recursion: Vec<String>,
    /// Descriptors of the transitive dependencies (applications only)
    pub includes: Vec<PathBuf>,
    pub bundle_resources: Vec<String>,
    /// Native sources compiled into this package's own target
    pub binding: bool,
    /// Native code built by the package's `binding.gyp`
    pub binding_gyp: bool,
    /// Needs native linking, directly or through a dependency
    pub native: bool,
    pub(crate) prepared: bool,
}

impl ExportPackageNode {
    pub fn new(
        source_dir: PathBuf,
        output_name: String,
        manifest: PackageManifest,
        is_app: bool,
        output: &Path,
        scan: SourceScan,
    ) -> Self {
        let include_dirs = if scan.has_native_files {
            vec![fsutil::relative_slash(output, &source_dir)]
        } else {
            Vec::new()
        };
        let gypi_path = output.join(format!("{}.gypi", output_name));

        Self {
            source_dir,
            output_name,
            manifest,
            is_app,
            gypi_path,
            sources: scan.sources,
            include_dirs,
            dependencies: scan.binding_gyp.iter().cloned().collect(),
            dependencies_recursion: Vec::new(),
            includes: Vec::new(),
            bundle_resources: Vec::new(),
            binding: scan.binding,
            binding_gyp: scan.binding_gyp.is_some(),
            native: false,
            prepared: false,
        }
    }

    /// Has native code of its own
    pub fn has_own_native(&self) -> bool {
        self.binding || self.binding_gyp
    }

    /// Declared dependencies in manifest order
    pub fn declared_dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.manifest.dependencies()
    }
}

/// Append `items` to `list`, keeping first occurrences and leaving out `except`
pub(crate) fn push_unique<I>(list: &mut Vec<String>, items: I, except: &str)
where
    I: IntoIterator<Item = String>,
{
    for item in items {
        if item != except && !list.contains(&item) {
            list.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_scan_lists_sources_relative_to_output() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "package.json", r#"{"name":"app","version":"1.0.0"}"#);
        write(root, "index.js", "");
        write(root, "src/view.h", "");
        write(root, "src/view.cc", "");
        write(root, ".git/config", "");
        write(root, "out/build/index.js", "");
        write(root, "project/linux/main.cc", "");
        write(root, "app.gyp", "{}");
        write(root, "package-lock.json", "{}");
        write(root, "node_modules/libx/package.json", r#"{"name":"libx","version":"2.0.0"}"#);
        write(root, "node_modules/libx/x.cc", "");
        write(root, "node_modules/@types/node/package.json", "{}");

        let manifest = PackageManifest::new("app", "1.0.0");
        let scan = scan_package(root, &manifest, root, &root.join("out")).unwrap();

        assert_eq!(
            scan.sources,
            vec!["../index.js", "../package.json", "../src/view.cc", "../src/view.h"]
        );
        assert!(scan.binding);
        assert!(scan.has_native_files);
        assert_eq!(scan.binding_gyp, None);
        assert_eq!(scan.nested, vec![root.join("node_modules/libx")]);
    }

    #[test]
    fn test_binding_gyp_suppresses_native_sources() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let pkg = root.join("node_modules/addon");
        write(&pkg, "package.json", r#"{"name":"addon","version":"1.0.0"}"#);
        write(&pkg, "binding.gyp", "{ 'targets': [ { 'target_name': 'addon_native' } ] }");
        write(&pkg, "src/addon.cc", "");

        let manifest = PackageManifest::new("addon", "1.0.0");
        let scan = scan_package(&pkg, &manifest, root, &root.join("out")).unwrap();

        assert_eq!(
            scan.binding_gyp.as_deref(),
            Some("node_modules/addon/binding.gyp:addon_native")
        );
        assert!(!scan.binding);
        assert!(scan.has_native_files);
        assert_eq!(
            scan.sources,
            vec!["../node_modules/addon/binding.gyp", "../node_modules/addon/package.json"]
        );

        let node = ExportPackageNode::new(
            pkg.clone(),
            "addon@1.0.0".to_string(),
            manifest,
            false,
            &root.join("out"),
            scan,
        );
        assert_eq!(node.include_dirs, vec!["../node_modules/addon"]);
        assert_eq!(node.dependencies, vec!["node_modules/addon/binding.gyp:addon_native"]);
        assert!(node.has_own_native());
        assert_eq!(node.gypi_path, root.join("out/addon@1.0.0.gypi"));
    }

    #[test]
    fn test_push_unique() {
        let mut list = vec!["a".to_string()];
        push_unique(&mut list, ["b", "a", "self", "b"].map(String::from), "self");
        assert_eq!(list, vec!["a", "b"]);
    }
}
