//! Filesystem helpers shared by the build and export pipelines

use crate::error::{BuildError, BuildResult};
use kiln_package::{Hash, HashingWriter};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// `http://` or `https://` source, which the pipelines refuse
pub fn is_url(source: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        source
            .get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}

pub fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Path rendered with `/` separators
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Relative path from directory `from` to `to`, with `/` separators.
///
/// Falls back to `to` itself when no relative path exists.
pub fn relative_slash(from: &Path, to: &Path) -> String {
    match pathdiff::diff_paths(to, from) {
        Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Some(rel) => to_slash(&rel),
        None => to_slash(to),
    }
}

/// Resolve `path` against the current directory when relative
pub fn absolute(path: &Path) -> BuildResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Remove a file or directory tree; a missing path is not an error
pub fn remove_path(path: &Path) -> BuildResult<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| BuildError::io(path, e))
}

pub fn create_dir_all(path: &Path) -> BuildResult<()> {
    fs::create_dir_all(path).map_err(|e| BuildError::io(path, e))
}

fn ensure_parent(path: &Path) -> BuildResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Write `contents`, creating parent directories
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> BuildResult<()> {
    ensure_parent(path)?;
    fs::write(path, contents).map_err(|e| BuildError::io(path, e))
}

pub fn read_file(path: &Path) -> BuildResult<Vec<u8>> {
    fs::read(path).map_err(|e| BuildError::io(path, e))
}

pub fn read_to_string(path: &Path) -> BuildResult<String> {
    fs::read_to_string(path).map_err(|e| BuildError::io(path, e))
}

/// Copy one file, creating parent directories
pub fn copy_file(source: &Path, target: &Path) -> BuildResult<()> {
    ensure_parent(target)?;
    fs::copy(source, target)
        .map(|_| ())
        .map_err(|e| BuildError::io(source, e))
}

/// Stream-copy one file and hash the bytes written
pub fn copy_file_hashed(source: &Path, target: &Path) -> BuildResult<Hash> {
    ensure_parent(target)?;
    let input = File::open(source).map_err(|e| BuildError::io(source, e))?;
    let output = File::create(target).map_err(|e| BuildError::io(target, e))?;

    let mut writer = HashingWriter::new(BufWriter::new(output));
    io::copy(&mut BufReader::new(input), &mut writer).map_err(|e| BuildError::io(source, e))?;
    let (_, hash) = writer.finish().map_err(|e| BuildError::io(target, e))?;
    Ok(hash)
}

/// `a` was modified strictly after `b`
pub fn newer_than(a: &Path, b: &Path) -> bool {
    let mtime = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (mtime(a), mtime(b)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

/// Copy a file or a directory tree.
///
/// Hidden entries are skipped when `ignore_hidden` is set, and anything
/// `exclude` accepts (file or directory) is left behind. Returns the number
/// of files copied.
pub fn copy_tree<F>(source: &Path, target: &Path, ignore_hidden: bool, exclude: F) -> BuildResult<usize>
where
    F: Fn(&Path) -> bool,
{
    let meta = fs::metadata(source).map_err(|e| BuildError::io(source, e))?;
    if meta.is_file() {
        copy_file(source, target)?;
        return Ok(1);
    }

    let mut copied = 0;
    let walker = WalkDir::new(source)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !((ignore_hidden && is_hidden(e.file_name())) || exclude(e.path()))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
            BuildError::io(path, io::Error::from(e))
        })?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| BuildError::io(entry.path(), io::Error::new(io::ErrorKind::Other, e)))?;
        let dest = target.join(rel);

        if entry.file_type().is_dir() {
            create_dir_all(&dest)?;
        } else {
            copy_file(entry.path(), &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}
