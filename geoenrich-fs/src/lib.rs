//! Capability-based filesystem helpers for the geoenrich CLI.
//!
//! Paths are UTF-8 (`camino`) and every operation goes through a `cap-std`
//! directory handle opened with ambient authority at the nearest base
//! (root, drive prefix or current directory).
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Kind of filesystem entry found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Nothing exists at the path.
    Missing,
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// A symlink target or special file that is neither of the above.
    Other,
}

/// Report what, if anything, exists at `path`.
///
/// A missing parent directory counts as [`EntryKind::Missing`].
pub fn entry_kind(path: &Utf8Path) -> io::Result<EntryKind> {
    let (dir, name) = match parent_dir_and_name(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(EntryKind::Missing),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) if meta.is_file() => Ok(EntryKind::File),
        Ok(meta) if meta.is_dir() => Ok(EntryKind::Directory),
        Ok(_) => Ok(EntryKind::Other),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(EntryKind::Missing),
        Err(err) => Err(err),
    }
}

/// Create (or truncate) the file at `path`, creating parent directories.
pub fn create_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let (dir, name) = parent_dir_and_name(path)?;
    dir.create(name.as_str())
}

/// Ensure the parent directory for `path` exists.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = split_base(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

fn parent_dir_and_name(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} has no file name")))?
        .to_owned();
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let (base, relative) = split_base(parent)?;
    let dir = if relative.as_str().is_empty() {
        base
    } else {
        base.open_dir(&relative)?
    };
    Ok((dir, name))
}

/// Split `path` into an ambient base directory and the remainder under it.
fn split_base(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let base = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(prefix).join(std::path::MAIN_SEPARATOR.to_string())
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string()),
        _ => Utf8PathBuf::from("."),
    };
    let relative = if base.as_str() == "." {
        path.to_path_buf()
    } else {
        path.strip_prefix(&base)
            .map_err(|_| io::Error::other(format!("failed to strip {base} from {path}")))?
            .to_path_buf()
    };
    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, relative))
}
