//! Build command - install dependencies, then build into out/

use crate::commands::install;
use crate::config::Context;
use anyhow::{Context as _, Result};

/// Run the build command
pub fn run(ctx: &Context) -> Result<()> {
    ctx.clean_if_requested()?;
    install::install(ctx, &[])?;

    let outcome = ctx.builder()?.build().context("Build failed")?;
    let manifest = &outcome.manifest;

    println!(
        "Built {}@{} in {:.2}s",
        manifest.name,
        manifest.version,
        outcome.total_time.as_secs_f64()
    );
    if let Some(hash) = &manifest.hash {
        println!("  Hash: {}", hash);
    }
    println!(
        "  Packages: {} built, {} copied",
        outcome.stats.packages_built, outcome.stats.packages_copied
    );
    println!(
        "  Files: {} written, {} skipped, {} links",
        outcome.stats.files_written, outcome.stats.files_skipped, outcome.stats.links_written
    );
    Ok(())
}
