//! Start command - run the project with the framework runtime

use crate::config::Context;
use anyhow::{Context as _, Result};
use kiln_build::ToolCommand;
use kiln_export::local_address;
use std::path::Path;

/// What the runtime is pointed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTarget {
    /// The local `out/build` tree
    Build,
    /// The debug server
    Web(String),
    /// Any other path or URL, passed through
    Other(String),
}

/// Pick the start target from the positional argument
pub fn resolve_target(target: Option<&str>, cwd: &Path, watch: bool, web: &str) -> StartTarget {
    match target {
        None if watch => StartTarget::Web(web.to_string()),
        None => StartTarget::Build,
        Some("web") => StartTarget::Web(web.to_string()),
        Some(path) if is_project_dir(path, cwd) => StartTarget::Build,
        Some(other) => StartTarget::Other(other.to_string()),
    }
}

fn is_project_dir(path: &str, cwd: &Path) -> bool {
    let candidate = cwd.join(path);
    match (candidate.canonicalize(), cwd.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Runtime arguments after the target
pub fn inspector_args(debug: Option<&str>, brk: bool) -> Vec<String> {
    match (debug, brk) {
        (Some(addr), true) => vec![format!("--inspect-brk={}", addr)],
        (None, true) => vec!["--inspect-brk=127.0.0.1:9229".to_string()],
        (Some(addr), false) => vec![format!("--inspect={}", addr)],
        (None, false) => Vec::new(),
    }
}

/// Run the start command
pub fn run(ctx: &Context, target: Option<&str>, extra: &[String]) -> Result<()> {
    let web = format!("http://{}:{}", local_address(), ctx.config.server.port);
    let target = match resolve_target(target, &ctx.cwd, ctx.options.watch, &web) {
        StartTarget::Build => {
            ctx.ensure_built()?;
            ctx.build_dir().to_string_lossy().to_string()
        }
        StartTarget::Web(url) | StartTarget::Other(url) => url,
    };

    let cmd = ToolCommand::from_command_line(&ctx.config.toolchain.runtime)?
        .arg("--pkgz-off=1")
        .arg(target)
        .args(inspector_args(ctx.options.debug.as_deref(), ctx.options.brk))
        .args(extra)
        .current_dir(&ctx.cwd);

    println!("Start running...");
    println!("{}", cmd.display());
    cmd.run_inherited().context("Runtime exited with an error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const WEB: &str = "http://10.0.0.1:1026";

    #[test]
    fn test_resolve_target() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("other")).unwrap();
        let cwd = temp.path();

        assert_eq!(resolve_target(None, cwd, false, WEB), StartTarget::Build);
        assert_eq!(resolve_target(None, cwd, true, WEB), StartTarget::Web(WEB.to_string()));
        assert_eq!(resolve_target(Some("web"), cwd, false, WEB), StartTarget::Web(WEB.to_string()));
        assert_eq!(resolve_target(Some("."), cwd, false, WEB), StartTarget::Build);
        assert_eq!(
            resolve_target(Some("other"), cwd, false, WEB),
            StartTarget::Other("other".to_string())
        );
        assert_eq!(
            resolve_target(Some("http://host:1026/"), cwd, false, WEB),
            StartTarget::Other("http://host:1026/".to_string())
        );
    }

    #[test]
    fn test_inspector_args() {
        assert!(inspector_args(None, false).is_empty());
        assert_eq!(inspector_args(Some("0.0.0.0:9229"), false), vec!["--inspect=0.0.0.0:9229"]);
        assert_eq!(inspector_args(None, true), vec!["--inspect-brk=127.0.0.1:9229"]);
        assert_eq!(inspector_args(Some("127.0.0.1:9000"), true), vec!["--inspect-brk=127.0.0.1:9000"]);
    }
}
