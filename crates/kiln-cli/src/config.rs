//! Effective settings for one invocation
//!
//! The global configuration (file plus `KILN_*` variables) with the command
//! line flags applied on top.

use anyhow::{Context as _, Result};
use kiln_build::{fsutil, Builder};
use kiln_config::{ConfigLoader, GlobalConfig};
use std::path::{Path, PathBuf};
use tracing::info;

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub port: Option<u16>,
    pub clean: bool,
    pub debug: Option<String>,
    pub brk: bool,
    pub watch: bool,
    pub minify: bool,
}

#[derive(Debug, Clone)]
pub struct Context {
    /// Project directory (the working directory)
    pub cwd: PathBuf,
    pub config: GlobalConfig,
    pub options: CliOptions,
}

impl Context {
    pub fn load(options: CliOptions) -> Result<Self> {
        let mut config = ConfigLoader::new().load().context("Failed to load configuration")?;
        if let Some(port) = options.port {
            config.server.port = port;
        }
        if options.minify {
            config.build.minify = Some(true);
        }

        let cwd = std::env::current_dir().context("Failed to read the working directory")?;
        Ok(Self { cwd, config, options })
    }

    /// `out/` below the project
    pub fn output(&self) -> PathBuf {
        self.cwd.join("out")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.output().join("build")
    }

    /// Remove previous build output when `--clean` was given
    pub fn clean_if_requested(&self) -> Result<()> {
        if !self.options.clean {
            return Ok(());
        }
        let output = self.output();
        for dir in ["build", "small", "tsbuildinfo"] {
            let path = output.join(dir);
            fsutil::remove_path(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        info!("Cleaned {}", output.display());
        Ok(())
    }

    pub fn builder(&self) -> Result<Builder> {
        let builder = Builder::new(&self.cwd, self.output())
            .with_context(|| format!("Cannot build {}", self.cwd.display()))?
            .with_compiler(self.config.toolchain.compiler.clone())
            .with_minify(self.config.build.minify)
            .with_ignore_hidden(self.config.build.ignore_hidden);
        Ok(builder)
    }

    /// Build unless `out/build` already holds a published manifest
    pub fn ensure_built(&self) -> Result<()> {
        if self.build_dir().join("package.json").is_file() {
            return Ok(());
        }
        self.builder()?.build().context("Build failed")?;
        Ok(())
    }

    /// Copy the SDK type declarations into `node_modules/@types` when absent
    pub fn install_types(&self) -> Result<()> {
        let Some(types) = &self.config.sdk.types else {
            return Ok(());
        };
        let target = self.cwd.join("node_modules").join("@types");
        if has_entries(&target) {
            return Ok(());
        }
        fsutil::copy_tree(types, &target, false, |_| false)
            .with_context(|| format!("Failed to copy type declarations from {}", types.display()))?;
        Ok(())
    }
}

fn has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
