//! Text patching for platform templates
//!
//! Scaffolded files are copied once and then patched in place on every
//! export, so user edits outside the patched spots survive. All edits go
//! through this module.

use crate::error::{ExportError, ExportResult};
use regex::{NoExpand, Regex};

/// Arguments the runtime is launched with from a generated entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartArgs {
    /// Debug build: load from the dev server, with the inspector
    pub debug_url: String,
    /// Debug build: load bundled resources, with the inspector
    pub debug_resource: String,
    /// Release build
    pub release_resource: String,
}

impl StartArgs {
    pub fn new(host: &str, port: u16, inspect: &str) -> Self {
        let inspect = format!(" --inspect={}", inspect);
        Self {
            debug_url: format!("http://{}:{}/{}", host, port, inspect),
            debug_resource: format!(".{}", inspect),
            release_resource: ".".to_string(),
        }
    }
}

fn pattern(re: &str) -> ExportResult<Regex> {
    Regex::new(re).map_err(|e| ExportError::template(re, e))
}

/// Replace the first match of `re` with the literal `with`
pub fn replace_first(text: &str, re: &str, with: &str) -> ExportResult<String> {
    Ok(pattern(re)?.replacen(text, 1, NoExpand(with)).into_owned())
}

/// Replace every match of `re` with the literal `with`
pub fn replace_all(text: &str, re: &str, with: &str) -> ExportResult<String> {
    Ok(pattern(re)?.replace_all(text, NoExpand(with)).into_owned())
}

/// Set the `<string>` following `<key>name</key>` in a property list
pub fn set_plist_string(text: &str, key: &str, value: &str) -> ExportResult<String> {
    let re = pattern(&format!(
        r"(<key>{}</key>\r?\n\s*<string>)[^<]*(</string>)",
        regex::escape(key)
    ))?;
    Ok(re
        .replacen(text, 1, |caps: &regex::Captures<'_>| {
            format!("{}{}{}", &caps[1], value, &caps[2])
        })
        .into_owned())
}

/// Fill the `ARGV_DEBUG`, `ARGV_DEBUG1` and `ARGV_RELEASE` placeholders.
///
/// `resource` wraps the resource arguments in the entry point's path helper
/// (`fs_resources`, `getPathInAssets`). Longer placeholders are replaced
/// first so `ARGV_DEBUG` never eats the prefix of `ARGV_DEBUG1`.
pub fn fill_start_args(text: &str, args: &StartArgs, resource: &str) -> String {
    text.replace("ARGV_DEBUG1", &format!("{}(\"{}\")", resource, args.debug_resource))
        .replace("ARGV_RELEASE", &format!("{}(\"{}\")", resource, args.release_resource))
        .replace("ARGV_DEBUG", &format!("\"{}\"", args.debug_url))
}

/// `TARGET_NAME = <name>` in a Makefile
pub fn set_makefile_target(text: &str, name: &str) -> ExportResult<String> {
    replace_all(text, r"(?m)^TARGET_NAME\s*\??=.*$", &format!("TARGET_NAME = {}", name))
}

/// Native library loaded by the Android activity
pub fn set_java_library(text: &str, library: &str) -> ExportResult<String> {
    replace_first(
        text,
        r#"String\s+LIBRARY\s+=\s+"[^"]+""#,
        &format!("String LIBRARY = \"{}\"", library),
    )
}

pub fn set_manifest_package(text: &str, id: &str) -> ExportResult<String> {
    replace_all(text, r#"package="[^"]+""#, &format!("package=\"{}\"", id))
}

pub fn set_manifest_lib_name(text: &str, library: &str) -> ExportResult<String> {
    replace_first(
        text,
        r#"android:name="android\.app\.lib_name"\s+android:value="[^"]+""#,
        &format!("android:name=\"android.app.lib_name\" android:value=\"{}\"", library),
    )
}

/// `<string name="app_name">…</string>`
pub fn set_app_name(text: &str, name: &str) -> ExportResult<String> {
    replace_first(
        text,
        r#"name="app_name">[^<]+<"#,
        &format!("name=\"app_name\">{}<", name),
    )
}

/// `key = "value"` assignment in a Gradle Kotlin script
pub fn set_gradle_value(text: &str, key: &str, value: &str) -> ExportResult<String> {
    replace_first(
        text,
        &format!(r#"{}\s*=\s*['"][^'"]+['"]"#, regex::escape(key)),
        &format!("{} = \"{}\"", key, value),
    )
}

/// Drop `android.externalNativeBuild.cmake.*` lines
pub fn strip_cmake_settings(text: &str) -> ExportResult<String> {
    replace_all(text, r"(?m)^.*android\.externalNativeBuild\.cmake\..+$", "")
}

/// Drop the output-directory overrides the generator writes into
/// `CMakeLists.txt`; they move the shared library out of the Gradle bundle.
pub fn strip_cmake_output_dirs(text: &str) -> ExportResult<String> {
    let text = replace_all(
        text,
        r"(?m)^set_target_properties\([^ ]+ PROPERTIES LIBRARY_OUTPUT_DIRECTORY [^)]+\)",
        "",
    )?;
    replace_all(
        &text,
        r#"(?m)^set_source_files_properties\([^ ]+ PROPERTIES GENERATED "TRUE"\)"#,
        "",
    )
}
