//! Utility functions for dirdelta
//!
//! File-level helpers shared by the comparator and the materializer.
//!
//! ## Categories of Utilities
//!
//! ### Content Comparison
//! - Exact byte-for-byte file comparison with a size shortcut
//! - Symbolic link target comparison
//!
//! ### Copying
//! - Single entry copy (file, directory tree or symbolic link)
//! - Cross-platform symbolic link creation
//!
//! ### Path Manipulation
//! - Converting absolute paths to relative paths
//! - Containment checks between roots
//! - Default output directory naming
//!
//! ## Error Handling
//!
//! I/O failures are reported as [`DirDeltaError::FileAccess`] carrying the
//! offending path, so callers can log or record exactly what failed.

use crate::error::{DirDeltaError, Result};
use crate::snapshot::EntryFilter;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

const COMPARE_BUFFER_SIZE: usize = 64 * 1024;

/// Compare two files byte for byte
///
/// Files of different length are unequal without reading them. Otherwise
/// both files are streamed in 64KB chunks and compared until the first
/// difference, so the answer is always exact.
///
/// # Errors
///
/// - [`DirDeltaError::FileAccess`] if either file cannot be opened or read
///
/// # Example
///
/// ```rust,ignore
/// use crate::utils::files_equal;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// if files_equal(Path::new("v1/a.txt"), Path::new("v2/a.txt"))? {
///     println!("unchanged");
/// }
/// # Ok(())
/// # }
/// ```
pub fn files_equal(left: &Path, right: &Path) -> Result<bool> {
    let left_len = fs::metadata(left)
        .map_err(|e| DirDeltaError::file_access(left, e))?
        .len();
    let right_len = fs::metadata(right)
        .map_err(|e| DirDeltaError::file_access(right, e))?
        .len();
    if left_len != right_len {
        return Ok(false);
    }

    let mut left_file = File::open(left).map_err(|e| DirDeltaError::file_access(left, e))?;
    let mut right_file = File::open(right).map_err(|e| DirDeltaError::file_access(right, e))?;
    let mut left_buf = vec![0u8; COMPARE_BUFFER_SIZE];
    let mut right_buf = vec![0u8; COMPARE_BUFFER_SIZE];

    loop {
        let left_read =
            read_full(&mut left_file, &mut left_buf).map_err(|e| DirDeltaError::file_access(left, e))?;
        let right_read =
            read_full(&mut right_file, &mut right_buf).map_err(|e| DirDeltaError::file_access(right, e))?;

        if left_read != right_read || left_buf[..left_read] != right_buf[..right_read] {
            return Ok(false);
        }
        if left_read == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as possible, stopping early only at end of file
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Compare two symbolic links by the path they point to
pub fn links_equal(left: &Path, right: &Path) -> Result<bool> {
    Ok(read_symlink(left)? == read_symlink(right)?)
}

/// Read symlink target
pub fn read_symlink(path: &Path) -> Result<PathBuf> {
    fs::read_link(path).map_err(|e| DirDeltaError::file_access(path, e))
}

/// Create a symlink (cross-platform)
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::unix::fs::symlink;
    symlink(target, link).map_err(|e| DirDeltaError::file_access(link, e))
}

/// Create a symlink (Windows)
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    let resolved = link.parent().map(|p| p.join(target)).unwrap_or_else(|| target.to_path_buf());
    let created = if resolved.is_dir() {
        symlink_dir(target, link)
    } else {
        symlink_file(target, link)
    };
    created.map_err(|e| DirDeltaError::file_access(link, e))
}

/// Copy one classified entry to its destination
///
/// Directories are copied with their full contents, files are copied on
/// their own and symbolic links are recreated when they are not followed
/// (or cannot be, because they dangle). Missing parent directories of
/// `dest` are created first. Inside a copied directory, entries matched by
/// `filter` (tested against `relative` joined with their path in the tree)
/// are skipped.
///
/// # Returns
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// - [`DirDeltaError::FileAccess`] naming the first path that failed
pub fn copy_entry(
    source: &Path,
    dest: &Path,
    relative: &Path,
    follow_symlinks: bool,
    filter: &EntryFilter,
) -> Result<u64> {
    let link_meta = fs::symlink_metadata(source).map_err(|e| DirDeltaError::file_access(source, e))?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| DirDeltaError::file_access(parent, e))?;
    }

    if link_meta.file_type().is_symlink() {
        let target_meta = if follow_symlinks { fs::metadata(source).ok() } else { None };
        match target_meta {
            Some(meta) if meta.is_dir() => return copy_tree(source, dest, relative, follow_symlinks, filter),
            Some(_) => return copy_file(source, dest),
            None => {
                let target = read_symlink(source)?;
                create_symlink(&target, dest)?;
                trace!("Recreated symlink {:?} -> {:?}", dest, target);
                return Ok(0);
            }
        }
    }

    if link_meta.is_dir() {
        copy_tree(source, dest, relative, follow_symlinks, filter)
    } else {
        copy_file(source, dest)
    }
}

fn copy_file(source: &Path, dest: &Path) -> Result<u64> {
    let bytes = fs::copy(source, dest).map_err(|e| DirDeltaError::file_access(source, e))?;
    trace!("Copied {:?} -> {:?} ({} bytes)", source, dest, bytes);
    Ok(bytes)
}

/// Recursively copy a directory tree, leaving out ignored entries
fn copy_tree(
    source: &Path,
    dest: &Path,
    relative: &Path,
    follow_symlinks: bool,
    filter: &EntryFilter,
) -> Result<u64> {
    let mut bytes = 0u64;

    let walker = WalkDir::new(source)
        .follow_links(follow_symlinks)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            match entry.path().strip_prefix(source) {
                Ok(inner) => !filter.is_ignored(entry.file_name(), &relative.join(inner)),
                Err(_) => true,
            }
        });

    for entry in walker {
        let entry = entry?;
        let inner = make_relative(entry.path(), source)?;
        let target = dest.join(&inner);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| DirDeltaError::file_access(&target, e))?;
        } else if file_type.is_symlink() {
            // Only reached when links are not followed
            let link_target = read_symlink(entry.path())?;
            create_symlink(&link_target, &target)?;
        } else {
            bytes += copy_file(entry.path(), &target)?;
        }
    }

    Ok(bytes)
}

/// Remove a file or directory tree, treating a missing path as success
///
/// # Returns
///
/// Returns `true` if something was removed.
pub fn remove_path_if_exists(path: &Path) -> Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DirDeltaError::file_access(path, e)),
    };

    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DirDeltaError::file_access(path, e)),
    }
}

/// Make a path relative to a base path
///
/// Attempts a lexical strip first so symbolic links inside the walked tree
/// keep their own path, falling back to canonicalization when the lexical
/// strip fails.
///
/// # Errors
///
/// - [`DirDeltaError::Internal`] if the path is not under the base path
/// - [`DirDeltaError::Io`] if canonicalization fails (fallback case only)
pub fn make_relative(path: &Path, base: &Path) -> Result<PathBuf> {
    if let Ok(relative) = path.strip_prefix(base) {
        return Ok(relative.to_path_buf());
    }

    let path_canon = path.canonicalize()?;
    let base_canon = base.canonicalize()?;

    path_canon
        .strip_prefix(&base_canon)
        .map(|p| p.to_path_buf())
        .map_err(|_| DirDeltaError::internal(format!(
            "Path {:?} is not relative to {:?}",
            path_canon, base_canon
        )))
}

/// Resolve a possibly non-existent path to an absolute, normalized form
///
/// The longest existing ancestor is canonicalized and the remaining
/// components are appended lexically, so the result can be compared with
/// canonical roots even before the path is created.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    let mut existing = normalized.as_path();
    let mut tail = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for name in tail.iter().rev() {
                resolved.push(name);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(normalized),
        }
    }
}

/// Check whether `path` equals `root` or lies beneath it
///
/// Both paths are resolved first, so relative spellings and symbolic links
/// in existing ancestors do not hide an overlap.
pub fn is_within(path: &Path, root: &Path) -> Result<bool> {
    let path = resolve_path(path)?;
    let root = resolve_path(root)?;
    Ok(path.starts_with(&root))
}

/// Default name of the changes directory for a pair of roots
///
/// Produces `diff-<prev>-to-<next>` from the final component of each root
/// after resolving it, so `.` and trailing separators still yield a real
/// directory name.
///
/// # Example
///
/// ```rust,ignore
/// use crate::utils::default_output_dir;
/// use std::path::{Path, PathBuf};
///
/// let out = default_output_dir(Path::new("/data/v1"), Path::new("/data/v2"));
/// assert_eq!(out, PathBuf::from("diff-v1-to-v2"));
/// ```
pub fn default_output_dir(prev_root: &Path, next_root: &Path) -> PathBuf {
    PathBuf::from(format!(
        "diff-{}-to-{}",
        root_name(prev_root),
        root_name(next_root)
    ))
}

/// Display name of a root: its final component, or the whole path when it has none
pub fn root_name(root: &Path) -> String {
    let resolved = resolve_path(root).unwrap_or_else(|_| root.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| resolved.display().to_string())
}

/// Format bytes in human-readable form
///
/// Uses binary units (1024-based); values under 1 KB are shown as whole
/// bytes, larger values with two decimal places.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
