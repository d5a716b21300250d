//! Build orchestration and the per-package pipeline
use crate::bundle::{self, VERSIONS_FILE};
use crate::classify::{self, FileClass, NEVER_ENTER};
use crate::error::{BuildError, BuildResult};
use crate::fsutil;
use crate::keys::KeysDocument;
use crate::minify::{Minifier, StripMinifier};
use crate::module_resolver;
use crate::session::{BuildSession, BuildStats, PackageNode, SEARCH_MODULES};
use crate::toolchain::{self, CompileRequest};

use kiln_package::{hash_bytes, ModuleTree, PackageManifest, SkipInstall, Validator, VersionRecord};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Build configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Leave out entries whose name starts with `.`
    pub ignore_hidden: bool,
    /// Force minification on or off; `None` defers to each manifest
    pub minify: Option<bool>,
    /// Compiler command line
    pub compiler: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            ignore_hidden: true,
            minify: None,
            compiler: "tsc".to_string(),
        }
    }
}

/// Result of a successful build
#[derive(Debug)]
pub struct BuildOutcome {
    /// Root manifest as written to the full tree, `modules` included
    pub manifest: PackageManifest,
    /// Output names of every dependency package
    pub packages: Vec<String>,
    pub build_counts: BTreeMap<String, usize>,
    pub stats: BuildStats,
    pub total_time: Duration,
}

/// Main builder: one source project into `target/{build,small,types}`
pub struct Builder {
    source: PathBuf,
    target: PathBuf,
    config: BuildConfig,
    minifier: Rc<dyn Minifier>,
}

impl Builder {
    /// Create a builder for the project directory `source`.
    ///
    /// URLs and anything that is not an existing directory are refused.
    pub fn new(source: impl AsRef<Path>, target: impl AsRef<Path>) -> BuildResult<Self> {
        let raw = source.as_ref();
        if fsutil::is_url(&raw.to_string_lossy()) {
            return Err(BuildError::InvalidSource(raw.display().to_string()));
        }

        let source = fsutil::absolute(raw)?;
        if !source.is_dir() {
            return Err(BuildError::InvalidSource(source.display().to_string()));
        }
        let target = fsutil::absolute(target.as_ref())?;

        Ok(Self {
            source,
            target,
            config: BuildConfig::default(),
            minifier: Rc::new(StripMinifier),
        })
    }

    /// Set build configuration
    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_minify(mut self, minify: Option<bool>) -> Self {
        self.config.minify = minify;
        self
    }

    pub fn with_ignore_hidden(mut self, ignore_hidden: bool) -> Self {
        self.config.ignore_hidden = ignore_hidden;
        self
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.config.compiler = compiler.into();
        self
    }

    /// Replace the built-in comment stripper
    pub fn with_minifier(mut self, minifier: Rc<dyn Minifier>) -> Self {
        self.minifier = minifier;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Execute the build
    pub fn build(&mut self) -> BuildResult<BuildOutcome> {
        let start = Instant::now();

        let manifest_path = self.source.join("package.json");
        if !manifest_path.is_file() {
            return Err(BuildError::config(&manifest_path, "package.json not found"));
        }
        let manifest = PackageManifest::from_file(&manifest_path)?;
        if let Err(errors) = Validator::validate(&manifest) {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BuildError::config(&manifest_path, message));
        }

        let mut session = BuildSession::new(&self.source, &self.target);
        session.ignore_hidden = self.config.ignore_hidden;
        session.minify = self.config.minify;
        session.compiler = self.config.compiler.clone();
        session.set_minifier(Rc::clone(&self.minifier));

        fsutil::create_dir_all(&session.target_full)?;
        fsutil::create_dir_all(&session.target_small)?;

        info!("Building {} v{}", manifest.name, manifest.version);

        let skip_install = manifest.skip_install_level();
        let outer_files = manifest.copy.clone();
        let root = PackageBuild::new(
            &session,
            self.source.clone(),
            String::new(),
            manifest.name.clone(),
            manifest,
            skip_install,
            true,
        );
        let root = root.run(&mut session)?;

        let mut published = root.manifest;
        published.modules = Some(session.module_tree(&root.symlink_records));
        published.write_to(&session.target_full.join("package.json"))?;

        // The root build clears the full tree, so outer files go in afterwards
        if let Some(items) = outer_files {
            self.copy_outer_files(&session, &items, skip_install)?;
        }

        let total_time = start.elapsed();
        info!(
            "Built {} packages ({} copied) in {:.2}s",
            session.stats.packages_built,
            session.stats.packages_copied,
            total_time.as_secs_f64()
        );

        Ok(BuildOutcome {
            manifest: published,
            packages: session.nodes().map(|n| n.output_name.clone()).collect(),
            build_counts: session.build_counts().clone(),
            stats: session.stats.clone(),
            total_time,
        })
    }

    /// Copy `@copy` entries (source path -> target path, empty keeps the name)
    fn copy_outer_files(
        &self,
        session: &BuildSession,
        items: &BTreeMap<String, String>,
        skip_install: SkipInstall,
    ) -> BuildResult<()> {
        for (source, target) in items {
            let target = if target.is_empty() { source } else { target };
            info!("Copy {}", source);

            let from = self.source.join(source);
            fsutil::copy_tree(&from, &session.target_full.join(target), session.ignore_hidden, |_| false)?;
            if !skip_install.is_set() {
                fsutil::copy_tree(&from, &session.target_small.join(target), session.ignore_hidden, |_| false)?;
            }
        }
        Ok(())
    }
}

/// One package moving through the pipeline
pub(crate) struct PackageBuild {
    source_dir: PathBuf,
    output_name: String,
    manifest: PackageManifest,
    skip_install: SkipInstall,
    is_session_root: bool,
    full_dir: PathBuf,
    small_dir: PathBuf,
    types_dir: PathBuf,
    skip_prefixes: Vec<String>,
    detach_prefixes: Vec<String>,
    minify: bool,
    compiled: bool,
    versions: VersionRecord,
    symlink_records: ModuleTree,
}

impl PackageBuild {
    pub(crate) fn new(
        session: &BuildSession,
        source_dir: PathBuf,
        rel_dir: String,
        output_name: String,
        manifest: PackageManifest,
        skip_install: SkipInstall,
        is_session_root: bool,
    ) -> Self {
        Self {
            full_dir: session.full_dir(&rel_dir),
            small_dir: session.small_dir(&rel_dir),
            types_dir: session.types_dir(&rel_dir),
            skip_prefixes: manifest.skip_prefixes(),
            detach_prefixes: manifest.detach_prefixes(),
            minify: session.minify_enabled(&manifest),
            source_dir,
            output_name,
            manifest,
            skip_install,
            is_session_root,
            compiled: false,
            versions: VersionRecord::new(),
            symlink_records: ModuleTree::new(),
        }
    }

    pub(crate) fn run(mut self, session: &mut BuildSession) -> BuildResult<PackageNode> {
        if self.manifest.hash.is_some() {
            self.copy_prebuilt(session)?;
            session.stats.packages_copied += 1;
        } else {
            self.full_build(session)?;
            session.stats.packages_built += 1;
        }

        Ok(PackageNode {
            output_name: self.output_name,
            source_dir: self.source_dir,
            manifest: self.manifest,
            symlink_records: self.symlink_records,
            skip_install: self.skip_install,
        })
    }

    fn log(&self, tag: &str, path: &str) {
        info!("{} {}/{}", tag, self.output_name, path);
    }

    /// Already built: take the source as is, with its bundle
    fn copy_prebuilt(&mut self, session: &BuildSession) -> BuildResult<()> {
        info!("Copy {} (prebuilt)", self.output_name);

        let bundle_name = bundle::bundle_file_name(&self.manifest.name);
        let target_root = session.target.clone();

        fsutil::remove_path(&self.full_dir)?;
        fsutil::remove_path(&self.small_dir)?;
        fsutil::copy_tree(&self.source_dir, &self.full_dir, session.ignore_hidden, |p| {
            p.starts_with(&target_root)
        })?;

        let local_bundle = self.source_dir.join(&bundle_name);
        if local_bundle.is_file() {
            bundle::unpack_bundle(&local_bundle, &self.full_dir)?;
        } else {
            let versions = VersionRecord::from_file(&self.source_dir.join(VERSIONS_FILE))?;
            bundle::write_bundle(&self.source_dir, &versions, &self.full_dir.join(&bundle_name))?;
            fsutil::copy_file(
                &self.source_dir.join("package.json"),
                &self.full_dir.join("package.json"),
            )?;
        }

        if !self.skip_install.is_set() {
            fsutil::copy_tree(&self.full_dir, &self.small_dir, session.ignore_hidden, |p| {
                p.extension().and_then(|e| e.to_str()) == Some("pkgz")
            })?;
        }
        Ok(())
    }

    fn full_build(&mut self, session: &mut BuildSession) -> BuildResult<()> {
        debug!(package = %self.output_name, minify = self.minify, "building");

        fsutil::remove_path(&self.small_dir)?;
        fsutil::remove_path(&self.full_dir)?;
        fsutil::create_dir_all(&self.small_dir)?;
        fsutil::create_dir_all(&self.full_dir)?;

        if self.source_dir.join("tsconfig.json").is_file() {
            toolchain::compile_package(
                &session.compiler,
                &CompileRequest {
                    package_dir: &self.source_dir,
                    out_dir: &self.full_dir,
                    declaration_dir: &self.types_dir,
                    is_session_root: self.is_session_root,
                },
            )?;
            self.compiled = true;
        }

        self.walk(session)?;

        let hashes = self.versions.package_hashes();
        let mut published = self.manifest.clone();
        published.strip_build_directives();
        published.pkgz_hash = Some(hashes.pkgz_hash);
        published.hash = Some(hashes.hash);

        self.versions.write_to(&self.full_dir.join(VERSIONS_FILE))?;
        published.write_to(&self.full_dir.join("package.json"))?;
        if !self.skip_install.is_set() {
            self.versions.write_to(&self.small_dir.join(VERSIONS_FILE))?;
            published.write_to(&self.small_dir.join("package.json"))?;
        }

        let archive = self.full_dir.join(bundle::bundle_file_name(&published.name));
        bundle::write_bundle(&self.full_dir, &self.versions, &archive)?;

        self.manifest = published;
        Ok(())
    }

    /// Depth-first walk in name order; `node_modules` goes to the resolver
    fn walk(&mut self, session: &mut BuildSession) -> BuildResult<()> {
        let ignore_hidden = session.ignore_hidden;
        let mut entries = WalkDir::new(&self.source_dir)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(ignore_hidden && fsutil::is_hidden(e.file_name())) && !NEVER_ENTER.contains(&name.as_ref())
            });

        while let Some(entry) = entries.next() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.source_dir.clone());
                BuildError::io(path, io::Error::from(e))
            })?;
            let rel = entry
                .path()
                .strip_prefix(&self.source_dir)
                .map(fsutil::to_slash)
                .map_err(|e| BuildError::io(entry.path(), io::Error::new(io::ErrorKind::Other, e)))?;

            if entry.file_type().is_dir() {
                if entry.file_name() == SEARCH_MODULES {
                    entries.skip_current_dir();
                    self.link_modules(session, &rel, entry.path())?;
                }
            } else {
                self.build_file(session, &rel)?;
            }
        }
        Ok(())
    }

    fn link_modules(&mut self, session: &mut BuildSession, rel: &str, dir: &Path) -> BuildResult<()> {
        let resolved =
            module_resolver::resolve_node_modules(session, self.is_session_root, self.skip_install, rel, dir)?;

        let from = self.full_dir.join(rel);
        for module in resolved.into_iter().filter(|m| m.needs_link) {
            let to = session.target_full.join(SEARCH_MODULES).join(&module.output_name);
            let symlink = fsutil::relative_slash(&from, &to);

            let mut record = module.manifest;
            record.symlink = Some(symlink.clone());
            self.symlink_records
                .entry(rel.to_string())
                .or_default()
                .insert(module.output_name, record);

            self.write_link(session, &format!("{}/{}.link", rel, module.name), &symlink)?;
        }
        Ok(())
    }

    /// `<dir>/<name>.link` marker holding the relative path to the shared build
    fn write_link(&mut self, session: &mut BuildSession, path: &str, symlink: &str) -> BuildResult<()> {
        let target = self.full_dir.join(path);
        fsutil::write_file(&target, symlink)?;
        self.versions
            .record(path, hash_bytes(symlink.as_bytes()).digest32(), false);

        if !self.skip_install.is_set() {
            fsutil::copy_file(&target, &self.small_dir.join(path))?;
        }
        session.stats.links_written += 1;
        Ok(())
    }

    fn build_file(&mut self, session: &mut BuildSession, rel: &str) -> BuildResult<()> {
        let class = classify::classify(rel, &self.skip_prefixes);
        match class {
            FileClass::ExplicitSkip => {
                self.log("Skip", rel);
                session.stats.files_skipped += 1;
                return Ok(());
            }
            FileClass::NativeSkip | FileClass::Declaration => {
                debug!(path = rel, ?class, "not bundled");
                session.stats.files_skipped += 1;
                return Ok(());
            }
            _ => {}
        }

        let source = self.source_dir.join(rel);
        if rel == "package.json" {
            // Recorded from the source; the published copy is written once hashed
            let digest = hash_bytes(&fsutil::read_file(&source)?).digest32();
            let detached = classify::matches_prefix(rel, &self.detach_prefixes);
            self.versions.record(rel, digest, detached);
            session.stats.files_written += 1;
            return Ok(());
        }

        let (out_rel, digest) = match class {
            FileClass::Script => {
                self.log("Out ", rel);
                let target = self.full_dir.join(rel);
                // Prefer the compiler's copy when it is fresher than the source
                let input = if self.compiled && target.is_file() && fsutil::newer_than(&target, &source) {
                    target.clone()
                } else {
                    source
                };
                (rel.to_string(), self.write_script(session, &input, &target)?)
            }
            FileClass::Compiled => {
                if !self.compiled {
                    info!("Ignore {}/{} (no tsconfig.json)", self.output_name, rel);
                    session.stats.files_skipped += 1;
                    return Ok(());
                }
                let js = classify::compiled_output_path(rel);
                self.log("Out ", &js);
                let target = self.full_dir.join(&js);
                let digest = self.write_script(session, &target, &target)?;
                (js, digest)
            }
            FileClass::KeyValueConfig => {
                self.log("Out ", rel);
                let text = fsutil::read_to_string(&source)?;
                let document = KeysDocument::parse(&text).map_err(|e| BuildError::config(&source, e))?;
                let canonical = document.to_canonical_string();
                fsutil::write_file(&self.full_dir.join(rel), &canonical)?;
                (rel.to_string(), hash_bytes(canonical.as_bytes()).digest32())
            }
            _ => {
                self.log("Copy", rel);
                let hash = fsutil::copy_file_hashed(&source, &self.full_dir.join(rel))?;
                (rel.to_string(), hash.digest32())
            }
        };

        if !self.skip_install.is_set() {
            fsutil::copy_file(&self.full_dir.join(&out_rel), &self.small_dir.join(&out_rel))?;
        }

        let detached = classify::matches_prefix(rel, &self.detach_prefixes);
        self.versions.record(out_rel, digest, detached);
        session.stats.files_written += 1;
        Ok(())
    }

    /// Write a script (minified when enabled) and return the digest of the written bytes
    fn write_script(&self, session: &BuildSession, input: &Path, target: &Path) -> BuildResult<String> {
        if !self.minify {
            let digest = if input == target {
                hash_bytes(&fsutil::read_file(input)?)
            } else {
                fsutil::copy_file_hashed(input, target)?
            };
            return Ok(digest.digest32());
        }

        let text = fsutil::read_to_string(input)?;
        let minified = session
            .minifier()
            .minify(&text)
            .map_err(|e| BuildError::compile(input, e.line, e.column, e.message))?;
        fsutil::write_file(target, &minified)?;
        Ok(hash_bytes(minified.as_bytes()).digest32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_url_source_rejected() {
        let result = Builder::new("https://example.com/app", "/tmp/out");
        assert!(matches!(result, Err(BuildError::InvalidSource(_))));
    }

    #[test]
    fn test_missing_source_rejected() {
        let temp = TempDir::new().unwrap();
        let result = Builder::new(temp.path().join("nope"), temp.path().join("out"));
        assert!(matches!(result, Err(BuildError::InvalidSource(_))));
    }

    #[test]
    fn test_missing_manifest_is_config_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.js"), "x()").unwrap();

        let err = Builder::new(temp.path(), temp.path().join("out"))
            .unwrap()
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_invalid_manifest_is_config_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), r#"{"name": "app", "version": "one"}"#).unwrap();

        let err = Builder::new(temp.path(), temp.path().join("out"))
            .unwrap()
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }
}
