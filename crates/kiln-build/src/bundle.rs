//! Bundle archives (`<name>.pkgz`)
//!
//! A bundle is a zip holding `versions.json` followed by every bundled path
//! of the version record. Entry timestamps are fixed so an unchanged package
//! produces a byte-identical archive.

use crate::error::{BuildError, BuildResult};
use crate::fsutil;
use kiln_package::VersionRecord;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Name of the version record inside a package and its bundle
pub const VERSIONS_FILE: &str = "versions.json";

/// File name of a package bundle
pub fn bundle_file_name(package_name: &str) -> String {
    format!("{}.pkgz", package_name)
}

fn file_options() -> FileOptions<'static, ()> {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

/// Archive `versions.json` and the bundled files of `record`, read from `root`.
pub fn write_bundle(root: &Path, record: &VersionRecord, target: &Path) -> BuildResult<()> {
    info!("Out  {}", target.file_name().map(|n| n.to_string_lossy()).unwrap_or_default());

    fsutil::remove_path(target)?;
    if let Some(parent) = target.parent() {
        fsutil::create_dir_all(parent)?;
    }

    let file = File::create(target).map_err(|e| BuildError::io(target, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let entries = std::iter::once(VERSIONS_FILE).chain(record.pkgz_files.keys().map(String::as_str));
    for name in entries {
        let source = root.join(name);
        zip.start_file(name, file_options())
            .map_err(|e| BuildError::archive(target, e))?;
        let mut input = BufReader::new(File::open(&source).map_err(|e| BuildError::io(&source, e))?);
        io::copy(&mut input, &mut zip).map_err(|e| BuildError::io(&source, e))?;
    }

    zip.finish().map_err(|e| BuildError::archive(target, e))?;
    Ok(())
}

/// Extract a bundle into `dest`
pub fn unpack_bundle(archive: &Path, dest: &Path) -> BuildResult<()> {
    let file = File::open(archive).map_err(|e| BuildError::io(archive, e))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| BuildError::archive(archive, e))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| BuildError::archive(archive, e))?;
        let rel = entry
            .enclosed_name()
            .ok_or_else(|| BuildError::archive(archive, format!("unsafe entry name '{}'", entry.name())))?;
        let out = dest.join(rel);

        if entry.is_dir() {
            fsutil::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fsutil::create_dir_all(parent)?;
        }
        let mut output = File::create(&out).map_err(|e| BuildError::io(&out, e))?;
        io::copy(&mut entry, &mut output).map_err(|e| BuildError::io(&out, e))?;
    }
    Ok(())
}

/// Entry names of a bundle, in archive order
pub fn list_bundle(archive: &Path) -> BuildResult<Vec<String>> {
    let file = File::open(archive).map_err(|e| BuildError::io(archive, e))?;
    let zip = ZipArchive::new(BufReader::new(file)).map_err(|e| BuildError::archive(archive, e))?;
    Ok(zip.file_names().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn package(dir: &Path) -> VersionRecord {
        fs::create_dir_all(dir.join("lib")).unwrap();
        fs::write(dir.join("index.js"), "main()").unwrap();
        fs::write(dir.join("lib/util.js"), "util()").unwrap();
        fs::write(dir.join("big.bin"), "detached").unwrap();

        let mut record = VersionRecord::new();
        record.record("lib/util.js", "u", false);
        record.record("index.js", "i", false);
        record.record("big.bin", "b", true);
        record.write_to(&dir.join(VERSIONS_FILE)).unwrap();
        record
    }

    #[test]
    fn test_entry_order_and_detached_excluded() {
        let temp = TempDir::new().unwrap();
        let record = package(temp.path());
        let archive = temp.path().join("out/demo.pkgz");

        write_bundle(temp.path(), &record, &archive).unwrap();

        assert_eq!(
            list_bundle(&archive).unwrap(),
            vec!["versions.json", "index.js", "lib/util.js"]
        );
    }

    #[test]
    fn test_deterministic_bytes() {
        let temp = TempDir::new().unwrap();
        let record = package(temp.path());
        let a = temp.path().join("a.pkgz");
        let b = temp.path().join("b.pkgz");

        write_bundle(temp.path(), &record, &a).unwrap();
        write_bundle(temp.path(), &record, &b).unwrap();

        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }

    #[test]
    fn test_unpack_restores_files() {
        let temp = TempDir::new().unwrap();
        let record = package(temp.path());
        let archive = temp.path().join("demo.pkgz");
        write_bundle(temp.path(), &record, &archive).unwrap();

        let dest = temp.path().join("restored");
        unpack_bundle(&archive, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("lib/util.js")).unwrap(), "util()");
        assert!(dest.join(VERSIONS_FILE).exists());
        assert!(!dest.join("big.bin").exists());
    }

    #[test]
    fn test_missing_bundled_file_is_error() {
        let temp = TempDir::new().unwrap();
        let mut record = package(temp.path());
        record.record("gone.js", "g", false);

        let result = write_bundle(temp.path(), &record, &temp.path().join("x.pkgz"));
        assert!(matches!(result, Err(BuildError::IoError { .. })));
    }
}
