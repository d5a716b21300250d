//! Native descriptors shipped with packages (`binding.gyp`)

use crate::error::{ExportError, ExportResult};
use kiln_build::{fsutil, lenient};
use std::path::Path;

pub const BINDING_GYP: &str = "binding.gyp";

/// `target_name` of the first target in a `binding.gyp`, if any.
///
/// The file is read leniently since these are hand-written in Python literal
/// style (single quotes, trailing commas, `#` comments).
pub fn first_target_name(path: &Path) -> ExportResult<Option<String>> {
    let text = fsutil::read_to_string(path)?;
    let value = lenient::parse(&text).map_err(|e| ExportError::config(path, e))?;

    Ok(value
        .get("targets")
        .and_then(|t| t.as_array())
        .and_then(|targets| targets.first())
        .and_then(|target| target.get("target_name"))
        .and_then(|name| name.as_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn parse(text: &str) -> ExportResult<Option<String>> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(BINDING_GYP);
        fs::write(&path, text).unwrap();
        first_target_name(&path)
    }

    #[test]
    fn test_python_style_descriptor() {
        let text = "{\n  # native addon\n  'targets': [\n    { 'target_name': 'addon', 'sources': ['a.cc',], },\n    { 'target_name': 'other' },\n  ],\n}\n";
        assert_eq!(parse(text).unwrap(), Some("addon".to_string()));
    }

    #[test]
    fn test_no_targets() {
        assert_eq!(parse("{ 'targets': [] }").unwrap(), None);
        assert_eq!(parse("{ 'targets': [ { 'type': 'none' } ] }").unwrap(), None);
    }

    #[test]
    fn test_malformed_is_config_error() {
        assert!(matches!(parse("{ 'targets': [ "), Err(ExportError::Config { .. })));
    }
}
