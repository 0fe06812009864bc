//! Path validation and the pure path helpers exposed by file managers.
//!
//! Every filesystem entry point on a directory handle takes paths relative to
//! the handle's directory; [`validate_relative`] is the check applied before
//! any of them touch the filesystem.

use crate::error::{Error, Result};
use globset::GlobBuilder;
use std::path::{Component, Path, PathBuf};

/// Separator used when rendering paths on this platform.
pub const PATH_SEPARATOR: char = std::path::MAIN_SEPARATOR;

/// Ensures `path` is relative and stays inside the directory it is joined to.
pub fn validate_relative(path: &Path) -> Result<()> {
    if path.is_absolute() || path.has_root() {
        return Err(Error::NotRelativePath(path.to_path_buf()));
    }
    let mut depth: usize = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::PathOutOfContext(path.to_path_buf()))?;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::NotRelativePath(path.to_path_buf()));
            }
        }
    }
    Ok(())
}

/// Ensures `path` is absolute.
pub fn validate_absolute(path: &Path) -> Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(Error::NotAbsolutePath(path.to_path_buf()))
    }
}

/// Reports whether anything exists at `path`.
///
/// A missing entry is `Ok(false)`; any other stat failure is an error.
pub fn is_file_exists(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Checks that `path` exists and is a directory.
pub fn validate_is_dir(path: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::FileDoesNotExist(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return Err(Error::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

pub fn join<I, P>(elems: I) -> PathBuf
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    elems.into_iter().fold(PathBuf::new(), |mut acc, elem| {
        acc.push(elem);
        acc
    })
}

/// Matches `path` against a shell pattern.
///
/// `*` and `?` never match the path separator.
pub fn matches(pattern: &str, path: &Path) -> Result<bool> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })?;
    Ok(glob.compile_matcher().is_match(path))
}

pub fn to_slash(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if PATH_SEPARATOR == '/' {
        rendered.into_owned()
    } else {
        rendered.replace(PATH_SEPARATOR, "/")
    }
}

/// Last element of `path`, `"."` for an empty path.
pub fn base(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None if path.as_os_str().is_empty() => ".".to_string(),
        None if path.has_root() => PATH_SEPARATOR.to_string(),
        None => path.to_string_lossy().into_owned(),
    }
}

/// Everything but the last element of `path`, `"."` when nothing remains.
pub fn dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_path_buf(),
        None if path.has_root() => path.to_path_buf(),
        None => PathBuf::from("."),
    }
}
