use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Relative paths of every regular file below `root`, sorted.
///
/// Symlinks to files are listed and copied by content. Symlinks to
/// directories and dangling links are not followed.
pub(crate) fn collect_relative_file_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());

    while let Some(dir) = queue.pop_front() {
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed reading directory {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                queue.push_back(path);
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                let relative_path = path.strip_prefix(root).with_context(|| {
                    format!(
                        "failed deriving relative path {} from {}",
                        path.display(),
                        root.display()
                    )
                })?;
                paths.push(relative_path.to_path_buf());
            } else {
                debug!(path = %path.display(), "skipping entry that is not a file");
            }
        }
    }

    paths.sort();
    Ok(paths)
}

pub(crate) fn files_identical(left: &Path, right: &Path) -> Result<bool> {
    let left_len = fs::metadata(left)
        .with_context(|| format!("failed to stat {}", left.display()))?
        .len();
    let right_len = fs::metadata(right)
        .with_context(|| format!("failed to stat {}", right.display()))?
        .len();
    if left_len != right_len {
        return Ok(false);
    }

    let left_bytes = fs::read(left).with_context(|| format!("failed to read {}", left.display()))?;
    let right_bytes =
        fs::read(right).with_context(|| format!("failed to read {}", right.display()))?;
    Ok(left_bytes == right_bytes)
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

pub(crate) fn copy_file_with_parents(source: &Path, destination: &Path) -> Result<()> {
    ensure_parent_dir(destination)?;
    fs::copy(source, destination).with_context(|| {
        format!(
            "failed copying file from {} to {}",
            source.display(),
            destination.display()
        )
    })?;
    Ok(())
}

/// Renames `source` to `destination`, copying across filesystems when needed.
pub(crate) fn move_path(source: &Path, destination: &Path) -> Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(err)
            .with_context(|| format!("failed to move missing path {}", source.display())),
        Err(_) => {
            let metadata = fs::symlink_metadata(source)
                .with_context(|| format!("failed to stat {}", source.display()))?;
            if metadata.is_dir() {
                copy_dir_recursive(source, destination)?;
                fs::remove_dir_all(source)
                    .with_context(|| format!("failed to remove {}", source.display()))?;
            } else {
                fs::copy(source, destination).with_context(|| {
                    format!(
                        "failed copying file from {} to {}",
                        source.display(),
                        destination.display()
                    )
                })?;
                fs::remove_file(source)
                    .with_context(|| format!("failed to remove {}", source.display()))?;
            }
            Ok(())
        }
    }
}

pub(crate) fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;
    for relative in collect_relative_file_paths(source)? {
        copy_file_with_parents(&source.join(&relative), &destination.join(&relative))?;
    }
    Ok(())
}

/// `path` with `suffix` appended to the full file name (`a.cfg` -> `a.cfg.bak`).
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

pub fn backup_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".bak")
}

/// Sidecar for a conflicting default: `.dist-new` goes before the last
/// extension (`a.cfg` -> `a.dist-new.cfg`, `README` -> `README.dist-new`).
pub fn dist_new_path(path: &Path) -> PathBuf {
    let (Some(stem), Some(extension)) = (path.file_stem(), path.extension()) else {
        return sibling_with_suffix(path, ".dist-new");
    };
    let mut name = OsString::from(stem);
    name.push(".dist-new.");
    name.push(extension);
    path.with_file_name(name)
}

pub(crate) fn dir_is_empty(path: &Path) -> Result<bool> {
    let mut entries =
        fs::read_dir(path).with_context(|| format!("failed reading directory {}", path.display()))?;
    Ok(entries.next().is_none())
}
