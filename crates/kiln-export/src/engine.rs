//! Export pipeline
//!
//! Turns a built project and its `node_modules` packages into generator
//! descriptors, runs the generator and scaffolds the platform project:
//!
//! 1. Build the project when `out/build` has no published manifest
//! 2. Stage configured SDK libraries, headers and resources into `out/usr`
//! 3. Register the project and every nested package ([`ExportEngine::add_module`])
//! 4. Resolve dependencies, write `out/<name>.gypi` per package, the umbrella
//!    `<name>.gyp` and `out/var.gypi`
//! 5. Run the generator, then patch the Android Studio project on android
//! 6. Ask the OS to open the result

use crate::descriptor::{
    write_json, Descriptor, Target, TargetType, UmbrellaGyp, UmbrellaVariables, VarGypi,
};
use crate::error::{ExportError, ExportResult};
use crate::generator::{run_generator, ProjectLayout};
use crate::package::{push_unique, scan_package, ExportPackageNode};
use crate::patch::StartArgs;
use crate::platform::Platform;
use crate::scaffold::{self, AppIdentity};
use kiln_build::{fsutil, Builder, ToolCommand};
use kiln_config::GlobalConfig;
use kiln_package::resolver::{resolve_dependencies, transitive_closure};
use kiln_package::PackageManifest;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Resources of the small tree never bundled with an application
const SKIP_RESOURCES: &[&str] = &["package-lock.json"];

const ANDROID_STUDIO: &str = "/Applications/Android Studio.app";

/// Export session for one project and one platform
#[derive(Debug)]
pub struct ExportEngine {
    source: PathBuf,
    output: PathBuf,
    proj_out: PathBuf,
    platform: Platform,
    config: GlobalConfig,
    /// Registered packages in insertion order
    outputs: Vec<ExportPackageNode>,
    index: HashMap<String, usize>,
    /// SDK resources staged into `out/usr`, relative to `out`
    bundle_resources: Vec<String>,
    root: Option<String>,
    host_address: Option<String>,
}

impl ExportEngine {
    pub fn new(source: impl AsRef<Path>, os: &str, config: GlobalConfig) -> ExportResult<Self> {
        let source = source.as_ref();
        let display = source.to_string_lossy();
        if fsutil::is_url(&display) {
            return Err(ExportError::InvalidSource(display.to_string()));
        }

        let source = fsutil::absolute(source)?;
        let manifest = source.join("package.json");
        if !manifest.is_file() {
            return Err(ExportError::config(manifest, "export source has no package.json"));
        }

        let platform: Platform = os.parse()?;
        let output = source.join("out");
        let proj_out = source.join("project").join(platform.as_str());
        fsutil::create_dir_all(&proj_out)?;

        Ok(Self {
            source,
            output,
            proj_out,
            platform,
            config,
            outputs: Vec::new(),
            index: HashMap::new(),
            bundle_resources: Vec::new(),
            root: None,
            host_address: None,
        })
    }

    /// Address written into debug start arguments instead of the detected one
    pub fn with_host_address(mut self, address: impl Into<String>) -> Self {
        self.host_address = Some(address.into());
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn proj_out(&self) -> &Path {
        &self.proj_out
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn node(&self, output_name: &str) -> Option<&ExportPackageNode> {
        self.index.get(output_name).map(|&i| &self.outputs[i])
    }

    /// Registered packages in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ExportPackageNode> {
        self.outputs.iter()
    }

    /// Register a package directory and everything under its `node_modules`.
    ///
    /// Packages are keyed by output name: the directory name, or
    /// `name@version` when `full_name` is set. Registering a known name
    /// returns it without rescanning.
    pub fn add_module(&mut self, path: &Path, is_app: bool, full_name: bool) -> ExportResult<String> {
        let source_dir = fsutil::absolute(path)?;
        let manifest = PackageManifest::from_file(&source_dir.join("package.json"))?;

        let output_name = if full_name {
            manifest.full_name()
        } else {
            source_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| ExportError::InvalidSource(source_dir.display().to_string()))?
        };
        if self.index.contains_key(&output_name) {
            return Ok(output_name);
        }

        let scan = scan_package(&source_dir, &manifest, &self.source, &self.output)?;
        let nested = scan.nested.clone();
        debug!(
            package = %output_name,
            sources = scan.sources.len(),
            nested = nested.len(),
            "registered package"
        );

        let node = ExportPackageNode::new(source_dir, output_name.clone(), manifest, is_app, &self.output, scan);
        self.index.insert(output_name.clone(), self.outputs.len());
        self.outputs.push(node);

        for dir in nested {
            self.add_module(&dir, false, true)?;
        }
        Ok(output_name)
    }

    fn ensure_root(&mut self) -> ExportResult<String> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let source = self.source.clone();
        let root = self.add_module(&source, true, false)?;
        self.root = Some(root.clone());
        Ok(root)
    }

    /// Declared dependencies of `node` that resolve to registered packages
    fn direct_dependencies(&self, node: &ExportPackageNode) -> Vec<String> {
        resolve_dependencies(node.declared_dependencies(), |name| self.index.contains_key(name))
            .into_iter()
            .filter(|name| name != &node.output_name)
            .collect()
    }

    /// Top-level entries of `out/small`, as bundle resources relative to `out`
    fn small_resources(&self) -> ExportResult<Vec<String>> {
        let small = self.output.join("small");
        if !small.is_dir() {
            warn!("{} is missing, no resources bundled", small.display());
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&small).map_err(|e| ExportError::io(&small, e))? {
            let entry = entry.map_err(|e| ExportError::io(&small, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("run") && !SKIP_RESOURCES.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names.into_iter().map(|name| format!("small/{}", name)).collect())
    }

    /// Resolve dependencies, closures, app resources and the native flag
    fn prepare(&mut self) -> ExportResult<()> {
        let direct: HashMap<String, Vec<String>> = self
            .outputs
            .iter()
            .map(|node| (node.output_name.clone(), self.direct_dependencies(node)))
            .collect();
        let own_native: HashSet<String> = self
            .outputs
            .iter()
            .filter(|node| node.has_own_native())
            .map(|node| node.output_name.clone())
            .collect();
        let small = if self.outputs.iter().any(|node| node.is_app && !node.prepared) {
            self.small_resources()?
        } else {
            Vec::new()
        };

        for node in self.outputs.iter_mut().filter(|node| !node.prepared) {
            let name = node.output_name.clone();
            let closure = transitive_closure(&name, |n| direct.get(n).cloned().unwrap_or_default());

            node.dependencies_recursion = node.dependencies.clone();
            push_unique(
                &mut node.dependencies,
                direct.get(&name).cloned().unwrap_or_default(),
                &name,
            );

            if node.is_app {
                node.includes = closure
                    .iter()
                    .map(|dep| self.output.join(format!("{}.gypi", dep)))
                    .collect();
                push_unique(&mut node.dependencies_recursion, closure.iter().cloned(), &name);
                push_unique(&mut node.bundle_resources, small.iter().cloned(), "");
                push_unique(&mut node.bundle_resources, self.bundle_resources.iter().cloned(), "");
            }

            node.native = node.has_own_native() || closure.iter().any(|dep| own_native.contains(dep));
            node.prepared = true;
            debug!(package = %name, native = node.native, deps = ?node.dependencies, "prepared");
        }
        Ok(())
    }

    fn host_address(&mut self) -> String {
        if let Some(address) = &self.host_address {
            return address.clone();
        }
        let address = local_address().to_string();
        self.host_address = Some(address.clone());
        address
    }

    fn start_args(&mut self, app: &ExportPackageNode) -> StartArgs {
        if app.manifest.skip_install_level().is_set() {
            warn!(
                "skipInstall may keep application {} from starting correctly",
                app.output_name
            );
        }
        let host = self.host_address();
        StartArgs::new(&host, self.config.server.port, &self.config.server.inspect)
    }

    /// Descriptor target of the package at `idx`, scaffolding the
    /// application project as a side effect
    fn target_for(&mut self, idx: usize) -> ExportResult<Target> {
        if self.platform.is_xcode() {
            self.xcode_target(idx)
        } else {
            self.native_target(idx)
        }
    }

    fn xcode_target(&mut self, idx: usize) -> ExportResult<Target> {
        let node = self.outputs[idx].clone();
        let is_app = node.is_app;
        let name = node.output_name.clone();
        let id = node
            .manifest
            .id
            .clone()
            .unwrap_or_else(|| "org.quark.${PRODUCT_NAME:rfc1034identifier}".to_string());

        let mut sources = node.sources.clone();
        let mut bundle_resources = node.bundle_resources.clone();
        if is_app {
            let app = AppIdentity {
                name: name.clone(),
                id: id.clone(),
                display_name: node.manifest.app.clone().unwrap_or_else(|| "${PRODUCT_NAME}".to_string()),
                version: node.manifest.version.clone(),
            };
            let args = self.start_args(&node);
            scaffold::scaffold_xcode(&self.proj_out, self.platform, &app, &args)?;

            push_unique(
                &mut bundle_resources,
                [scaffold::STORYBOARD, scaffold::XCASSETS]
                    .map(|file| format!("../project/<(os)/{}", file)),
                "",
            );
            push_unique(
                &mut sources,
                [scaffold::PLIST, scaffold::XCODE_MAIN].map(|file| format!("../project/<(os)/{}", file)),
                "",
            );
        }

        let kind = if is_app {
            TargetType::Executable
        } else if node.binding {
            TargetType::StaticLibrary
        } else {
            TargetType::None
        };

        let mut variables = BTreeMap::new();
        let mut xcode_settings = BTreeMap::new();
        if is_app {
            variables.insert(
                "XCODE_INFOPLIST_FILE".to_string(),
                format!("$(SRCROOT)/project/<(os)/{}", scaffold::PLIST),
            );
            xcode_settings.insert("INFOPLIST_FILE".to_string(), "<(XCODE_INFOPLIST_FILE)".to_string());
            xcode_settings.insert("SKIP_INSTALL".to_string(), "NO".to_string());
            xcode_settings.insert("ASSETCATALOG_COMPILER_APPICON_NAME".to_string(), "AppIcon".to_string());
            xcode_settings.insert("PRODUCT_BUNDLE_IDENTIFIER".to_string(), id);
        }

        let mut target = Target::new(name.clone(), kind);
        target.variables = Some(variables);
        target.product_name = Some(name);
        target.include_dirs = node.include_dirs.clone();
        target.dependencies = if is_app {
            node.dependencies_recursion.clone()
        } else {
            node.dependencies.clone()
        };
        target.direct_dependent_settings.include_dirs = if is_app { Vec::new() } else { node.include_dirs.clone() };
        target.sources = sources.clone();
        target.mac_bundle = Some(u8::from(is_app));
        target.mac_bundle_resources = Some(if is_app { bundle_resources.clone() } else { Vec::new() });
        target.xcode_settings = Some(xcode_settings);

        let stored = &mut self.outputs[idx];
        stored.sources = sources;
        stored.bundle_resources = bundle_resources;
        Ok(target)
    }

    /// android and linux
    fn native_target(&mut self, idx: usize) -> ExportResult<Target> {
        let node = self.outputs[idx].clone();
        let name = node.output_name.clone();
        let mut sources = node.sources.clone();

        let kind = if node.is_app {
            match self.platform {
                Platform::Android if node.native => {
                    if !node.binding {
                        scaffold::install_empty_source(&self.output)?;
                        push_unique(&mut sources, [scaffold::EMPTY_SOURCE.to_string()], "");
                    }
                    TargetType::SharedLibrary
                }
                Platform::Android => TargetType::None,
                _ => {
                    let app = AppIdentity {
                        name: name.clone(),
                        id: node.manifest.id.clone().unwrap_or_else(|| format!("org.quark.{}", name)),
                        display_name: node.manifest.app.clone().unwrap_or_else(|| name.clone()),
                        version: node.manifest.version.clone(),
                    };
                    let args = self.start_args(&node);
                    scaffold::scaffold_linux(&self.proj_out, &app, &args)?;
                    push_unique(
                        &mut sources,
                        [format!("../project/linux/{}", scaffold::LINUX_MAIN_FILE)],
                        "",
                    );
                    TargetType::Executable
                }
            }
        } else if node.binding {
            TargetType::StaticLibrary
        } else {
            TargetType::None
        };

        let mut target = Target::new(name, kind);
        target.include_dirs = node.include_dirs.clone();
        target.dependencies = if node.is_app {
            node.dependencies_recursion.clone()
        } else {
            node.dependencies.clone()
        };
        target.direct_dependent_settings.include_dirs = if node.is_app {
            Vec::new()
        } else {
            node.include_dirs.clone()
        };
        target.sources = sources.clone();
        if self.platform == Platform::Linux {
            target.ldflags = Some(vec!["${LDFLAGS}".to_string()]);
        }

        self.outputs[idx].sources = sources;
        Ok(target)
    }

    /// Write every package descriptor and the umbrella `<name>.gyp`.
    ///
    /// Libraries are written before applications. Returns the umbrella path.
    pub fn write_descriptors(&mut self) -> ExportResult<PathBuf> {
        let root = self.ensure_root()?;
        self.prepare()?;

        for idx in 0..self.outputs.len() {
            if !self.outputs[idx].is_app {
                let target = self.target_for(idx)?;
                write_json(&self.outputs[idx].gypi_path, &Descriptor { targets: vec![target] })?;
            }
        }

        let mut includes: Vec<String> = Vec::new();
        for idx in 0..self.outputs.len() {
            if self.outputs[idx].is_app {
                let node = &self.outputs[idx];
                let descriptors = node
                    .includes
                    .iter()
                    .chain(std::iter::once(&node.gypi_path))
                    .map(|path| fsutil::relative_slash(&self.source, path))
                    .collect::<Vec<_>>();
                push_unique(&mut includes, descriptors, "");

                let target = self.target_for(idx)?;
                write_json(&self.outputs[idx].gypi_path, &Descriptor { targets: vec![target] })?;
            }
        }

        let libquark = match &self.config.sdk.core_project {
            Some(project) => format!("{}:libquark", fsutil::relative_slash(&self.source, project)),
            None => "libquark".to_string(),
        };
        let umbrella = UmbrellaGyp {
            variables: UmbrellaVariables { libquark: vec![libquark] },
            includes,
        };
        let umbrella_path = self.source.join(format!("{}.gyp", root));
        write_json(&umbrella_path, &umbrella)?;
        info!("Out {}", umbrella_path.display());
        Ok(umbrella_path)
    }

    fn layout(&self, name: &str) -> ProjectLayout {
        ProjectLayout::new(self.platform, &self.source, &self.output, &self.proj_out, name)
    }

    /// Write descriptors, run the generator and scaffold the platform project
    pub fn generate(&mut self) -> ExportResult<ProjectLayout> {
        let root = self.ensure_root()?;
        self.write_descriptors()?;

        let layout = self.layout(&root);
        write_json(
            &self.output.join("var.gypi"),
            &VarGypi::new(self.platform.as_str(), layout.style, &self.source),
        )?;
        run_generator(
            &self.config.toolchain.generator,
            &layout,
            &self.source,
            &self.output,
            &self.config.sdk.gyp_includes,
            &root,
        )?;

        if self.platform == Platform::Android {
            self.generate_android_studio(&root, &layout)?;
        }
        Ok(layout)
    }

    fn generate_android_studio(&mut self, root: &str, layout: &ProjectLayout) -> ExportResult<()> {
        let node = self
            .node(root)
            .cloned()
            .ok_or_else(|| ExportError::InvalidSource(self.source.display().to_string()))?;
        let app = AppIdentity {
            name: root.to_string(),
            id: node
                .manifest
                .id
                .clone()
                .unwrap_or_else(|| format!("org.quark.{}", root))
                .replace('-', "_"),
            display_name: node.manifest.app.clone().unwrap_or_else(|| root.to_string()),
            version: node.manifest.version.clone(),
        };
        let args = self.start_args(&node);
        scaffold::scaffold_android_studio(&self.proj_out, &app, &args, node.native, &layout.project_paths)
    }

    /// Build the project unless `out/build` already holds a published manifest
    pub fn ensure_built(&self) -> ExportResult<()> {
        if self.output.join("build").join("package.json").is_file() {
            return Ok(());
        }
        info!("No build output, building {}", self.source.display());
        Builder::new(&self.source, &self.output)?
            .with_compiler(self.config.toolchain.compiler.clone())
            .with_minify(self.config.build.minify)
            .with_ignore_hidden(self.config.build.ignore_hidden)
            .build()?;
        Ok(())
    }

    fn copy_to_usr(&self, source: &Path) -> ExportResult<PathBuf> {
        let name = source
            .file_name()
            .ok_or_else(|| ExportError::config(source, "SDK path has no file name"))?;
        let target = self.output.join("usr").join(name);
        fsutil::remove_path(&target)?;
        fsutil::copy_tree(source, &target, false, |_| false)?;
        Ok(target)
    }

    /// Copy configured SDK libraries, headers and resources into `out/usr`
    pub fn stage_sdk(&mut self) -> ExportResult<()> {
        let sdk = self.config.sdk.clone();

        for library in self.config.libraries_for(self.platform.as_str()) {
            let target = self.copy_to_usr(library)?;
            for entry in WalkDir::new(&target) {
                let entry = entry.map_err(|e| ExportError::io(&target, std::io::Error::from(e)))?;
                scaffold::set_executable(entry.path())?;
            }
        }
        for include in &sdk.includes {
            self.copy_to_usr(include)?;
        }
        for resource in &sdk.bundle_resources {
            let target = self.copy_to_usr(resource)?;
            let rel = fsutil::relative_slash(&self.output, &target);
            push_unique(&mut self.bundle_resources, [rel], "");
        }
        Ok(())
    }

    /// Everything `export` does short of opening the project.
    ///
    /// With `only_open`, an existing project is left as is. Returns the path
    /// to open.
    pub fn prepare_project(&mut self, only_open: bool) -> ExportResult<PathBuf> {
        self.ensure_built()?;
        self.stage_sdk()?;
        let root = self.ensure_root()?;

        let layout = self.layout(&root);
        let existing = match self.platform {
            Platform::Android => self.proj_out.join("app"),
            _ => layout.project_paths.first().cloned().unwrap_or_else(|| self.proj_out.clone()),
        };
        if !only_open || !existing.exists() {
            self.generate()?;
        }

        Ok(match self.platform {
            Platform::Ios | Platform::Mac => existing,
            Platform::Android | Platform::Linux => self.proj_out.clone(),
        })
    }

    /// Export, then ask the OS to open the project
    pub fn export(&mut self, only_open: bool) -> ExportResult<PathBuf> {
        let project = self.prepare_project(only_open)?;
        self.open(&project);
        info!("export {} complete", self.platform);
        Ok(project)
    }

    /// Best effort; failures are only logged
    fn open(&self, project: &Path) {
        let host = Platform::host();
        if self.platform == Platform::Linux && host != Some(Platform::Linux) {
            warn!("Linux projects only build on Linux");
        }
        if self.platform.is_xcode() && host != Some(Platform::Mac) {
            warn!("Xcode projects only open on macOS");
        }

        let command = match (&self.config.toolchain.opener, host) {
            (Some(opener), _) => ToolCommand::from_command_line(opener),
            (None, Some(Platform::Mac))
                if self.platform == Platform::Android && Path::new(ANDROID_STUDIO).exists() =>
            {
                ToolCommand::from_command_line("open").map(|cmd| cmd.arg("-a").arg(ANDROID_STUDIO))
            }
            (None, Some(Platform::Mac)) => ToolCommand::from_command_line("open"),
            (None, _) => ToolCommand::from_command_line("xdg-open"),
        };

        if let Err(e) = command.and_then(|cmd| cmd.arg(project.as_os_str()).spawn_detached()) {
            warn!("Could not open {}: {}", project.display(), e);
        }
    }
}

/// Address of the interface that routes outward, or loopback.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub fn local_address() -> IpAddr {
    let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .ok()
        .filter(|ip| !ip.is_unspecified())
        .unwrap_or(loopback)
}
