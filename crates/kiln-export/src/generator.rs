//! External native project generator
//!
//! The generator reads the umbrella `<name>.gyp` in the project root and
//! writes a platform project (Xcode, CMake or Makefiles).

use crate::error::ExportResult;
use crate::platform::Platform;
use kiln_build::{fsutil, ToolCommand, ToolOutput};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the generator writes for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub style: &'static str,
    /// `--generator-output`, relative to the project root
    pub generator_output: String,
    /// Files that exist once the project has been generated
    pub project_paths: Vec<PathBuf>,
}

impl ProjectLayout {
    pub fn new(platform: Platform, source: &Path, output: &Path, proj_out: &Path, name: &str) -> Self {
        let style = platform.generator_style();
        let proj_rel = fsutil::relative_slash(source, proj_out);

        match platform {
            Platform::Ios | Platform::Mac => Self {
                style,
                generator_output: proj_rel,
                project_paths: vec![proj_out.join(format!("{}.xcodeproj", name))],
            },
            Platform::Android => {
                let gen_out = output.join("android").join(name);
                Self {
                    style,
                    generator_output: fsutil::relative_slash(source, &gen_out),
                    project_paths: ["Release", "Debug"]
                        .iter()
                        .map(|build| gen_out.join("out").join(build).join("CMakeLists.txt"))
                        .collect(),
                }
            }
            Platform::Linux => Self {
                style,
                generator_output: format!("{}/mk", proj_rel),
                project_paths: vec![proj_out.join("mk")],
            },
        }
    }
}

/// Generator arguments, in invocation order
pub fn generator_args(
    layout: &ProjectLayout,
    source: &Path,
    output: &Path,
    includes: &[PathBuf],
    name: &str,
) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        layout.style.to_string(),
        format!("--generator-output={}", layout.generator_output),
        format!("-Goutput_dir={}", fsutil::relative_slash(source, output)),
        "-Gstandalone".to_string(),
        "-Iout/var.gypi".to_string(),
    ];
    args.extend(
        includes
            .iter()
            .map(|include| format!("-I{}", fsutil::relative_slash(source, include))),
    );
    args.push(format!("{}.gyp", name));
    args.push("--depth=.".to_string());
    args
}

/// Run the generator in `source`
pub fn run_generator(
    command_line: &str,
    layout: &ProjectLayout,
    source: &Path,
    output: &Path,
    includes: &[PathBuf],
    name: &str,
) -> ExportResult<ToolOutput> {
    let cmd = ToolCommand::from_command_line(command_line)?
        .args(generator_args(layout, source, output, includes, name))
        .current_dir(source);

    info!("Generate {} project {}", layout.style, name);
    let result = cmd.run()?;
    if !result.stdout.trim().is_empty() {
        debug!("{}", result.stdout.trim_end());
    }
    if !result.stderr.trim().is_empty() {
        debug!("{}", result.stderr.trim_end());
    }
    Ok(result)
}
