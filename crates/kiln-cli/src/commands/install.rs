//! Install command - run the dependency installer

use crate::config::Context;
use anyhow::{Context as _, Result};
use kiln_build::install_dependencies;

/// Run the configured installer in the project, then add the SDK types
pub fn install(ctx: &Context, extra: &[String]) -> Result<()> {
    let installed = install_dependencies(&ctx.config.toolchain.installer, &ctx.cwd, extra)
        .context("Installing dependencies failed")?;
    if installed {
        ctx.install_types()?;
    }
    Ok(())
}

/// Run the install command
pub fn run(ctx: &Context, args: &[String]) -> Result<()> {
    install(ctx, args)
}
