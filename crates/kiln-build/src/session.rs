//! Build session state
//!
//! One [`BuildSession`] lives for a single `build()` call. It owns the output
//! roots and the registry of dependency packages, keyed by output name, so a
//! dependency reachable from many places is built once.

use crate::minify::{Minifier, StripMinifier};
use kiln_package::{ModuleTree, PackageManifest, SkipInstall};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Directory that holds dependency packages
pub const SEARCH_MODULES: &str = "node_modules";

/// A dependency package known to the session
#[derive(Debug, Clone)]
pub struct PackageNode {
    pub output_name: String,
    pub source_dir: PathBuf,
    /// Manifest as published (identity hashes set, build directives removed)
    pub manifest: PackageManifest,
    /// `dirPath -> outputName -> manifest` for the links this package wrote
    pub symlink_records: ModuleTree,
    pub skip_install: SkipInstall,
}

/// Counters reported after a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Packages built from source
    pub packages_built: usize,
    /// Packages copied because they were already built
    pub packages_copied: usize,
    pub files_written: usize,
    pub files_skipped: usize,
    pub links_written: usize,
}

pub struct BuildSession {
    pub source: PathBuf,
    pub target: PathBuf,
    pub target_full: PathBuf,
    pub target_small: PathBuf,
    pub target_types: PathBuf,
    pub ignore_hidden: bool,
    /// Overrides every manifest's `minify` when set
    pub minify: Option<bool>,
    pub compiler: String,
    pub stats: BuildStats,
    minifier: Rc<dyn Minifier>,
    registry: BTreeMap<String, PackageNode>,
    build_counts: BTreeMap<String, usize>,
}

impl BuildSession {
    pub fn new(source: impl Into<PathBuf>, target: &Path) -> Self {
        Self {
            source: source.into(),
            target: target.to_path_buf(),
            target_full: target.join("build"),
            target_small: target.join("small"),
            target_types: target.join("types"),
            ignore_hidden: true,
            minify: None,
            compiler: "tsc".to_string(),
            stats: BuildStats::default(),
            minifier: Rc::new(StripMinifier),
            registry: BTreeMap::new(),
            build_counts: BTreeMap::new(),
        }
    }

    pub fn set_minifier(&mut self, minifier: Rc<dyn Minifier>) {
        self.minifier = minifier;
    }

    pub fn minifier(&self) -> &dyn Minifier {
        self.minifier.as_ref()
    }

    /// Effective minify flag for a package
    pub fn minify_enabled(&self, manifest: &PackageManifest) -> bool {
        self.minify.or(manifest.minify).unwrap_or(false)
    }

    /// Claim `output_name` for building.
    ///
    /// Returns false when the package was already built or is being built
    /// further up the stack.
    pub fn begin(&mut self, output_name: &str) -> bool {
        if self.build_counts.contains_key(output_name) {
            return false;
        }
        self.build_counts.insert(output_name.to_string(), 1);
        true
    }

    pub fn register(&mut self, node: PackageNode) {
        self.registry.insert(node.output_name.clone(), node);
    }

    pub fn node(&self, output_name: &str) -> Option<&PackageNode> {
        self.registry.get(output_name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.registry.values()
    }

    /// Times `output_name` was built in this session (0 or 1)
    pub fn build_count(&self, output_name: &str) -> usize {
        self.build_counts.get(output_name).copied().unwrap_or(0)
    }

    pub fn build_counts(&self) -> &BTreeMap<String, usize> {
        &self.build_counts
    }

    /// Full-tree directory of a package output directory
    pub fn full_dir(&self, rel_dir: &str) -> PathBuf {
        join_rel(&self.target_full, rel_dir)
    }

    pub fn small_dir(&self, rel_dir: &str) -> PathBuf {
        join_rel(&self.target_small, rel_dir)
    }

    pub fn types_dir(&self, rel_dir: &str) -> PathBuf {
        join_rel(&self.target_types, rel_dir)
    }

    /// Nested-module tree for the root manifest.
    ///
    /// Every registered package appears under `node_modules` carrying its own
    /// link records as `modules`; the root's link records are merged in.
    pub fn module_tree(&self, root_links: &ModuleTree) -> ModuleTree {
        let mut tree = ModuleTree::new();

        if !self.registry.is_empty() {
            let deps = tree.entry(SEARCH_MODULES.to_string()).or_default();
            for node in self.registry.values() {
                let mut manifest = node.manifest.clone();
                manifest.modules = Some(node.symlink_records.clone());
                deps.insert(node.output_name.clone(), manifest);
            }
        }

        for (dir, entries) in root_links {
            let slot = tree.entry(dir.clone()).or_default();
            for (name, manifest) in entries {
                slot.insert(name.clone(), manifest.clone());
            }
        }
        tree
    }
}

fn join_rel(base: &Path, rel: &str) -> PathBuf {
    if rel.is_empty() {
        base.to_path_buf()
    } else {
        base.join(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(name: &str) -> PackageNode {
        PackageNode {
            output_name: name.to_string(),
            source_dir: PathBuf::from("/src").join(name),
            manifest: PackageManifest::new(name, "1.0.0"),
            symlink_records: ModuleTree::new(),
            skip_install: SkipInstall::None,
        }
    }

    #[test]
    fn test_begin_claims_once() {
        let mut session = BuildSession::new("/src", Path::new("/out"));
        assert!(session.begin("a@1.0.0"));
        assert!(!session.begin("a@1.0.0"));
        assert_eq!(session.build_count("a@1.0.0"), 1);
        assert_eq!(session.build_count("b"), 0);
    }

    #[test]
    fn test_minify_override() {
        let mut session = BuildSession::new("/src", Path::new("/out"));
        let mut manifest = PackageManifest::new("a", "1.0.0");
        assert!(!session.minify_enabled(&manifest));

        manifest.minify = Some(true);
        assert!(session.minify_enabled(&manifest));

        session.minify = Some(false);
        assert!(!session.minify_enabled(&manifest));
    }

    #[test]
    fn test_module_tree_merges_root_links() {
        let mut session = BuildSession::new("/src", Path::new("/out"));
        let mut a = node("a");
        let mut linked = PackageManifest::new("c", "2.0.0");
        linked.symlink = Some("../../c@2.0.0".to_string());
        a.symlink_records
            .entry("node_modules".to_string())
            .or_default()
            .insert("c@2.0.0".to_string(), linked.clone());
        session.register(a);
        session.register(node("c@2.0.0"));

        let mut root_links = ModuleTree::new();
        root_links
            .entry("lib/node_modules".to_string())
            .or_default()
            .insert("c@2.0.0".to_string(), linked.clone());

        let tree = session.module_tree(&root_links);

        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["lib/node_modules", "node_modules"]);
        let deps = &tree["node_modules"];
        assert_eq!(deps.keys().collect::<Vec<_>>(), vec!["a", "c@2.0.0"]);
        assert_eq!(
            deps["a"].modules.as_ref().unwrap()["node_modules"]["c@2.0.0"],
            linked
        );
        assert_eq!(deps["c@2.0.0"].modules, Some(ModuleTree::new()));
    }

    #[test]
    fn test_output_dirs() {
        let session = BuildSession::new("/src", Path::new("/out"));
        assert_eq!(session.full_dir(""), PathBuf::from("/out/build"));
        assert_eq!(session.small_dir("node_modules/a"), PathBuf::from("/out/small/node_modules/a"));
        assert_eq!(session.types_dir("node_modules/a"), PathBuf::from("/out/types/node_modules/a"));
    }
}
