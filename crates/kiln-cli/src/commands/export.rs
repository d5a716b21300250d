//! Export and open commands

use crate::config::Context;
use anyhow::{anyhow, Context as _, Result};
use kiln_export::{local_address, ExportEngine, Platform};

/// Export for `os` (the host when absent) and open the project.
///
/// With `only_open`, an existing project is opened as is.
pub fn run(ctx: &Context, os: Option<&str>, only_open: bool) -> Result<()> {
    ctx.clean_if_requested()?;

    let os = match os {
        Some(os) => os.to_string(),
        None => Platform::host()
            .map(|p| p.to_string())
            .ok_or_else(|| anyhow!("No export target for this host, name one of ios, android, mac, linux"))?,
    };

    let mut engine = ExportEngine::new(&ctx.cwd, &os, ctx.config.clone())
        .with_context(|| format!("Cannot export {}", ctx.cwd.display()))?
        .with_host_address(local_address().to_string());
    let project = engine.export(only_open).context("Export failed")?;

    println!("Exported {} project {}", os, project.display());
    Ok(())
}
