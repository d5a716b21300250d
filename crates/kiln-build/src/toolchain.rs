//! External tools
//!
//! The compiler, dependency installer, project generator and OS helpers are
//! configured as command lines and run as child processes, one at a time.

use crate::error::{BuildError, BuildResult};
use crate::fsutil;
use crate::lenient;
use serde_json::json;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Result of a finished tool run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// A configured command line plus call-site arguments
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    /// Split a configured command line (`"npm install --only=prod"`) with
    /// shell quoting rules, so quoted paths may contain spaces
    pub fn from_command_line(line: &str) -> BuildResult<Self> {
        let parts = shlex::split(line)
            .ok_or_else(|| BuildError::config("", format!("unbalanced quotes in command line '{}'", line)))?;
        let mut parts = parts.into_iter();
        let program = parts
            .next()
            .ok_or_else(|| BuildError::config("", format!("empty command line '{}'", line)))?;
        Ok(Self {
            program,
            args: parts.map(OsString::from).collect(),
            cwd: None,
        })
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Human-readable command line
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run with captured output; a non-zero exit is an error
    pub fn run(&self) -> BuildResult<ToolOutput> {
        let line = self.display();
        debug!(command = %line, "running tool");

        let output = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::ToolSpawn {
                command: line.clone(),
                error: e,
            })?
            .wait_with_output()
            .map_err(|e| BuildError::ToolSpawn {
                command: line.clone(),
                error: e,
            })?;

        let result = ToolOutput {
            command: line,
            exit_code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if output.status.success() {
            Ok(result)
        } else {
            Err(BuildError::ToolFailed {
                command: result.command,
                code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            })
        }
    }

    /// Run attached to the terminal; a non-zero exit is an error
    pub fn run_inherited(&self) -> BuildResult<()> {
        let line = self.display();
        debug!(command = %line, "running tool");

        let status = self.command().status().map_err(|e| BuildError::ToolSpawn {
            command: line.clone(),
            error: e,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::ToolFailed {
                command: line,
                code: status.code().unwrap_or(1),
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    /// Start without waiting (OS "open" helpers)
    pub fn spawn_detached(&self) -> BuildResult<()> {
        let line = self.display();
        self.command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| BuildError::ToolSpawn {
                command: line,
                error: e,
            })
    }
}

/// Where the compiler writes one package
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    pub package_dir: &'a Path,
    pub out_dir: &'a Path,
    pub declaration_dir: &'a Path,
    pub is_session_root: bool,
}

/// Name of the temporary descriptor written next to `tsconfig.json`
pub const TEMP_TSCONFIG: &str = ".tsconfig.json";

/// Compile a package that carries a `tsconfig.json`.
///
/// Removes the configured incremental build-info file, writes a temporary
/// descriptor extending the package's own with the output directories, runs
/// the compiler in the package directory and removes the descriptor again.
pub fn compile_package(compiler: &str, request: &CompileRequest<'_>) -> BuildResult<ToolOutput> {
    let tsconfig_path = request.package_dir.join("tsconfig.json");
    let text = fsutil::read_to_string(&tsconfig_path)?;
    let tsconfig = lenient::parse(&text).map_err(|e| BuildError::config(&tsconfig_path, e))?;

    if let Some(info) = tsconfig
        .pointer("/compilerOptions/tsBuildInfoFile")
        .and_then(|v| v.as_str())
    {
        let info_path = Path::new(info);
        let info_path = if info_path.is_absolute() {
            info_path.to_path_buf()
        } else {
            request.package_dir.join(info_path)
        };
        debug!(path = %info_path.display(), "removing build info");
        fsutil::remove_path(&info_path)?;
    }

    let mut exclude = vec!["node_modules", "out", ".git"];
    if request.is_session_root {
        exclude.push("project");
    }
    let descriptor = json!({
        "extends": "./tsconfig.json",
        "exclude": exclude,
        "compilerOptions": {
            "outDir": fsutil::to_slash(request.out_dir),
            "declarationDir": fsutil::to_slash(request.declaration_dir),
            "declaration": true
        }
    });

    let descriptor_path = request.package_dir.join(TEMP_TSCONFIG);
    let body = serde_json::to_string_pretty(&descriptor)
        .map_err(|e| BuildError::config(&descriptor_path, e))?;
    fsutil::write_file(&descriptor_path, body)?;

    info!("Compile {}", request.package_dir.display());
    let result = ToolCommand::from_command_line(compiler)
        .map(|cmd| {
            cmd.arg("-project")
                .arg(TEMP_TSCONFIG)
                .current_dir(request.package_dir)
        })
        .and_then(|cmd| cmd.run());

    fsutil::remove_path(&descriptor_path)?;
    result
}

/// Run the dependency installer in `project_dir` with extra arguments.
///
/// A project without `package.json` has nothing to install.
pub fn install_dependencies(installer: &str, project_dir: &Path, extra: &[String]) -> BuildResult<bool> {
    if !project_dir.join("package.json").exists() {
        tracing::warn!("No package.json in {}, nothing installed", project_dir.display());
        return Ok(false);
    }

    info!("Install dependencies ...");
    ToolCommand::from_command_line(installer)?
        .args(extra)
        .current_dir(project_dir)
        .run_inherited()?;
    Ok(true)
}
