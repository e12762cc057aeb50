//! Single-level directory listings
//!
//! A [`DirectorySnapshot`] captures the entries of one directory exactly once,
//! records what kind each entry is, and answers whether an entry matches the
//! same-named entry of another snapshot. The comparator builds two snapshots
//! per visited directory level and never lists a directory twice.

use crate::error::{DirDeltaError, Result};
use crate::types::EntryKind;
use crate::utils;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// Entry filter applied while listing
///
/// Matches glob patterns against both an entry's own name and its path
/// relative to the comparison root.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntryFilter {
    ignore: Option<GlobSet>,
}

impl EntryFilter {
    pub(crate) fn new(ignore: Option<GlobSet>) -> Self {
        Self { ignore }
    }

    /// Compile ignore globs; an empty list ignores nothing
    pub(crate) fn from_patterns(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| DirDeltaError::InvalidPattern(format!("{}: {}", pattern, e)))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| DirDeltaError::InvalidPattern(e.to_string()))?;
        Ok(Self::new(Some(set)))
    }

    pub(crate) fn is_ignored(&self, name: &OsStr, relative: &Path) -> bool {
        match &self.ignore {
            Some(set) => set.is_match(name) || set.is_match(relative),
            None => false,
        }
    }
}

/// The entries of one directory, keyed by name
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    dir: PathBuf,
    entries: BTreeMap<OsString, EntryKind>,
}

impl DirectorySnapshot {
    /// List `dir` and classify every entry
    ///
    /// With `follow_symlinks`, links are classified by what they point at;
    /// a link whose target cannot be resolved stays an [`EntryKind::Symlink`].
    /// Without it, every link is an [`EntryKind::Symlink`].
    ///
    /// # Errors
    ///
    /// - [`DirDeltaError::FileAccess`] if the directory cannot be listed
    pub fn read(dir: &Path, follow_symlinks: bool) -> Result<Self> {
        Self::read_filtered(dir, Path::new(""), follow_symlinks, &EntryFilter::default())
    }

    pub(crate) fn read_filtered(
        dir: &Path,
        relative: &Path,
        follow_symlinks: bool,
        filter: &EntryFilter,
    ) -> Result<Self> {
        let mut entries = BTreeMap::new();

        let listing = fs::read_dir(dir).map_err(|e| DirDeltaError::file_access(dir, e))?;
        for entry in listing {
            let entry = entry.map_err(|e| DirDeltaError::file_access(dir, e))?;
            let name = entry.file_name();
            if filter.is_ignored(&name, &relative.join(&name)) {
                continue;
            }
            let kind = classify(&entry.path(), follow_symlinks)?;
            entries.insert(name, kind);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    /// Directory this snapshot was taken of
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no (non-ignored) entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kind of the named entry, if present
    pub fn get(&self, name: &OsStr) -> Option<EntryKind> {
        self.entries.get(name).copied()
    }

    /// All entries in name order
    pub fn entries(&self) -> impl Iterator<Item = (&OsStr, EntryKind)> + '_ {
        self.entries.iter().map(|(name, kind)| (name.as_os_str(), *kind))
    }

    /// Entries present here but not in `other`
    pub fn only_in<'a>(&'a self, other: &'a DirectorySnapshot) -> impl Iterator<Item = (&'a OsStr, EntryKind)> + 'a {
        self.entries().filter(move |(name, _)| other.get(name).is_none())
    }

    /// Entries present in both snapshots, with the kind on each side
    pub fn common_with<'a>(
        &'a self,
        other: &'a DirectorySnapshot,
    ) -> impl Iterator<Item = (&'a OsStr, EntryKind, EntryKind)> + 'a {
        self.entries()
            .filter_map(move |(name, kind)| other.get(name).map(|other_kind| (name, kind, other_kind)))
    }

    /// Whether the named entry has the same content in both snapshots
    ///
    /// Only meaningful for entries that are files (or unfollowed links) on
    /// both sides; entries of differing kinds are never equal.
    pub fn same_entry(&self, other: &DirectorySnapshot, name: &OsStr) -> Result<bool> {
        let left = self.dir.join(name);
        let right = other.dir.join(name);
        match (self.get(name), other.get(name)) {
            (Some(EntryKind::File), Some(EntryKind::File)) => utils::files_equal(&left, &right),
            (Some(EntryKind::Symlink), Some(EntryKind::Symlink)) => utils::links_equal(&left, &right),
            _ => Ok(false),
        }
    }
}

/// Determine the kind of a single path
fn classify(path: &Path, follow_symlinks: bool) -> Result<EntryKind> {
    let meta = fs::symlink_metadata(path).map_err(|e| DirDeltaError::file_access(path, e))?;

    if meta.file_type().is_symlink() {
        if !follow_symlinks {
            return Ok(EntryKind::Symlink);
        }
        return Ok(match fs::metadata(path) {
            Ok(target) if target.is_dir() => EntryKind::Directory,
            Ok(_) => EntryKind::File,
            Err(_) => EntryKind::Symlink,
        });
    }

    Ok(if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    })
}
