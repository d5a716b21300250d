//! File classification
//!
//! Decides, from a package-relative path, how a file is treated by the
//! build walk.

use std::path::Path;

/// Native source extensions; compiled by the platform project, never bundled
pub const NATIVE_SOURCE: &[&str] = &["c", "cc", "cpp", "cxx", "m", "mm", "s", "swift"];

/// Native header extensions
pub const NATIVE_HEADER: &[&str] = &["h", "hpp", "hxx"];

/// Names the walk never enters, at any depth
pub const NEVER_ENTER: &[&str] = &["project", "out", "package-lock.json", "tsconfig.json"];

/// How one file is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Native source, header or project descriptor
    NativeSkip,
    /// Matched a skip prefix
    ExplicitSkip,
    /// `.ts`, `.tsx` or `.jsx`; taken from the compiler output
    Compiled,
    /// `.d.ts`-style declaration, dropped
    Declaration,
    /// `.js`
    Script,
    /// `.keys`
    KeyValueConfig,
    /// Copied byte for byte
    Binary,
}

/// Lower-cased extension without the dot
pub fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

pub fn is_native_source(path: &str) -> bool {
    extension(path).is_some_and(|e| NATIVE_SOURCE.contains(&e.as_str()))
}

pub fn is_native_header(path: &str) -> bool {
    extension(path).is_some_and(|e| NATIVE_HEADER.contains(&e.as_str()))
}

/// Plain string-prefix match, so `out` also matches `outline.js`
pub fn matches_prefix(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| path.starts_with(p.as_str()))
}

/// Classify a package-relative, `/`-separated path
pub fn classify(path: &str, skip_prefixes: &[String]) -> FileClass {
    if matches_prefix(path, skip_prefixes) {
        return FileClass::ExplicitSkip;
    }

    let ext = extension(path).unwrap_or_default();
    if is_native_source(path) || is_native_header(path) || ext == "gyp" || ext == "gypi" {
        return FileClass::NativeSkip;
    }

    match ext.as_str() {
        "js" => FileClass::Script,
        "ts" | "tsx" | "jsx" => {
            if is_declaration(path) {
                FileClass::Declaration
            } else {
                FileClass::Compiled
            }
        }
        "keys" => FileClass::KeyValueConfig,
        _ => FileClass::Binary,
    }
}

/// `name.d.ts`, `name.d.tsx`
fn is_declaration(path: &str) -> bool {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase().ends_with(".d"))
        .unwrap_or(false)
}

/// Output path of a compiled source: extension replaced by `.js`
pub fn compiled_output_path(path: &str) -> String {
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => format!("{}.js", &path[..dot]),
        _ => format!("{}.js", path),
    }
}
