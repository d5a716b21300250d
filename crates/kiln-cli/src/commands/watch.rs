//! Watch mode - rebuild the project on file changes

use crate::config::Context;
use anyhow::{Context as _, Result};
use notify::{RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Changes closer together than this trigger a single rebuild
const DEBOUNCE_MS: u64 = 300;

/// Directories below the project root whose changes never trigger a rebuild
const IGNORED_DIRS: [&str; 2] = ["out", "project"];

/// Run the watch command
pub fn run(ctx: &Context) -> Result<()> {
    ctx.clean_if_requested()?;
    ctx.ensure_built()?;

    let root = ctx.cwd.canonicalize().unwrap_or_else(|_| ctx.cwd.clone());
    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .context("Failed to start watching the project")?;

    warn!("No debug server is started, serve out/ with your own tool");
    println!("Watching {} for changes...", root.display());
    println!("Press Ctrl+C to stop\n");

    let debounce = Duration::from_millis(DEBOUNCE_MS);
    let mut last_run: Option<Instant> = None;

    loop {
        match rx.recv() {
            Ok(Ok(event)) => {
                if !event.paths.iter().any(|p| is_relevant_change(p, &root)) {
                    continue;
                }
                let now = Instant::now();
                if last_run.is_some_and(|last| now.duration_since(last) < debounce) {
                    continue;
                }
                last_run = Some(now);
                rebuild(ctx);
            }
            Ok(Err(e)) => warn!("Watch error: {}", e),
            Err(e) => {
                error!("Watch channel closed: {}", e);
                break;
            }
        }
    }
    Ok(())
}

fn rebuild(ctx: &Context) {
    info!("Change detected, rebuilding...");
    let result = ctx.builder().and_then(|mut builder| builder.build().map_err(Into::into));
    match result {
        Ok(outcome) => info!(
            "Rebuilt {} in {:.2}s",
            outcome.manifest.name,
            outcome.total_time.as_secs_f64()
        ),
        Err(e) => error!("Build failed: {:#}", e),
    }
}

/// Whether a changed path under `root` should trigger a rebuild.
///
/// Build output, exported projects, hidden entries and generated
/// `*.gyp` files are ignored.
pub fn is_relevant_change(changed: &Path, root: &Path) -> bool {
    let Ok(relative) = changed.strip_prefix(root) else {
        return false;
    };

    let mut components = relative.components().map(|c| c.as_os_str().to_string_lossy());
    match components.next() {
        None => return false,
        Some(first) if IGNORED_DIRS.iter().any(|dir| first == *dir) => return false,
        Some(first) if first.starts_with('.') => return false,
        Some(_) => {}
    }
    if components.any(|c| c.starts_with('.')) {
        return false;
    }

    changed.extension().map_or(true, |ext| ext != "gyp")
}
