//! Core data types used throughout dirdelta
//!
//! This module contains the data structures shared between the comparison
//! engine, the materializer and the command-line front end.
//!
//! ## Overview
//!
//! - **Entries**: `EntryKind` - what a directory entry turned out to be
//! - **Classification**: `Category`, `ClassificationResult` - the outcome of a comparison
//! - **Copying**: `CopyReport`, `CategoryStats`, `CopyFailure` - the outcome of materialization
//! - **Progress**: `ProgressInfo` - callback payload for long-running copies
//!
//! ## Examples
//!
//! ```rust
//! use dirdelta::types::{Category, ClassificationResult};
//!
//! let result = ClassificationResult::default();
//! assert!(!result.has_changes());
//! assert_eq!(Category::Removed.folder_name(), Some("Removed"));
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Kind of a directory entry as seen by the comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file (or any non-directory that is not treated as a link)
    File,
    /// Directory
    Directory,
    /// Symbolic link that is compared by its target path rather than followed
    Symlink,
}

impl EntryKind {
    /// Whether the entry is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// Classification bucket for a relative path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Present on both sides with identical content
    Unchanged,
    /// Present on both sides with different content or a different kind
    Modified,
    /// Present only in the next tree
    Added,
    /// Present only in the previous tree
    Removed,
}

impl Category {
    /// The categories that get materialized, in copy order
    pub const CHANGES: [Category; 3] = [Category::Modified, Category::Added, Category::Removed];

    /// Name of the subfolder this category is copied into
    ///
    /// Unchanged entries are never copied, so they have no folder.
    pub fn folder_name(&self) -> Option<&'static str> {
        match self {
            Category::Unchanged => None,
            Category::Modified => Some("Modified"),
            Category::Added => Some("Added"),
            Category::Removed => Some("Removed"),
        }
    }

    /// Whether entries of this category are copied from the previous tree
    ///
    /// Removed paths only exist in the previous tree; everything else is
    /// taken from the next tree.
    pub fn sources_from_prev(&self) -> bool {
        matches!(self, Category::Removed)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Category::Unchanged => "Unchanged",
            Category::Modified => "Modified",
            Category::Added => "Added",
            Category::Removed => "Removed",
        };
        f.write_str(label)
    }
}

/// Result of comparing two directory trees
///
/// Holds four disjoint lists of paths relative to the compared roots. A
/// value is built once by [`TreeComparator`](crate::comparator::TreeComparator)
/// and never changes afterwards; every list is sorted by path.
///
/// # Examples
///
/// ```rust,no_run
/// use dirdelta::compare;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = compare(Path::new("v1"), Path::new("v2"))?;
/// for path in result.modified() {
///     println!("~ {}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    unchanged: Vec<PathBuf>,
    modified: Vec<PathBuf>,
    added: Vec<PathBuf>,
    removed: Vec<PathBuf>,
}

impl ClassificationResult {
    /// Paths present in both trees with identical content
    pub fn unchanged(&self) -> &[PathBuf] {
        &self.unchanged
    }

    /// Paths present in both trees whose content or kind differs
    pub fn modified(&self) -> &[PathBuf] {
        &self.modified
    }

    /// Paths present only in the next tree
    pub fn added(&self) -> &[PathBuf] {
        &self.added
    }

    /// Paths present only in the previous tree
    pub fn removed(&self) -> &[PathBuf] {
        &self.removed
    }

    /// Paths of a given category
    pub fn paths(&self, category: Category) -> &[PathBuf] {
        match category {
            Category::Unchanged => &self.unchanged,
            Category::Modified => &self.modified,
            Category::Added => &self.added,
            Category::Removed => &self.removed,
        }
    }

    /// Find which category a relative path was classified into
    pub fn category_of(&self, path: &Path) -> Option<Category> {
        [
            Category::Unchanged,
            Category::Modified,
            Category::Added,
            Category::Removed,
        ]
        .into_iter()
        .find(|category| self.paths(*category).binary_search_by(|p| p.as_path().cmp(path)).is_ok())
    }

    /// Iterate over every classified path together with its category
    pub fn iter(&self) -> impl Iterator<Item = (Category, &Path)> + '_ {
        [
            Category::Unchanged,
            Category::Modified,
            Category::Added,
            Category::Removed,
        ]
        .into_iter()
        .flat_map(move |category| {
            self.paths(category)
                .iter()
                .map(move |path| (category, path.as_path()))
        })
    }

    /// Total number of classified paths
    pub fn len(&self) -> usize {
        self.unchanged.len() + self.total_changes()
    }

    /// Whether nothing was found in either tree
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of modified, added and removed paths
    pub fn total_changes(&self) -> usize {
        self.modified.len() + self.added.len() + self.removed.len()
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    pub(crate) fn push(&mut self, category: Category, path: PathBuf) {
        match category {
            Category::Unchanged => self.unchanged.push(path),
            Category::Modified => self.modified.push(path),
            Category::Added => self.added.push(path),
            Category::Removed => self.removed.push(path),
        }
    }

    /// Fold a child directory's result into this one
    pub(crate) fn merge(&mut self, other: ClassificationResult) {
        self.unchanged.extend(other.unchanged);
        self.modified.extend(other.modified);
        self.added.extend(other.added);
        self.removed.extend(other.removed);
    }

    /// Sort every list so results do not depend on traversal order
    pub(crate) fn finish(mut self) -> Self {
        self.unchanged.sort();
        self.modified.sort();
        self.added.sort();
        self.removed.sort();
        self
    }
}

/// Copy statistics for one category
///
/// Counts are per classified entry. Almost every entry is a single file;
/// a file/directory mismatch reported as modified is one entry however
/// many files the copied directory holds, and its bytes are all counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    /// Entries we tried to copy
    pub attempted: usize,
    /// Entries copied successfully
    pub copied: usize,
    /// Entries that failed to copy
    pub failed: usize,
    /// Bytes written for successful entries
    pub bytes_copied: u64,
}

/// A single entry that could not be copied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyFailure {
    /// Category the entry belonged to
    pub category: Category,
    /// Relative path of the entry
    pub path: PathBuf,
    /// Error description
    pub error: String,
}

/// Result of materializing a classification into an output directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    /// Output root the changes were copied into
    pub out_root: PathBuf,
    /// Statistics for `Modified/`
    pub modified: CategoryStats,
    /// Statistics for `Added/`
    pub added: CategoryStats,
    /// Statistics for `Removed/`
    pub removed: CategoryStats,
    /// Entries that failed, sorted by category then path
    pub failures: Vec<CopyFailure>,
    /// Wall-clock time spent populating the output, in milliseconds
    pub duration_ms: u64,
}

impl CopyReport {
    /// Statistics for a category (`Unchanged` is never copied and reports zeros)
    pub fn stats(&self, category: Category) -> CategoryStats {
        match category {
            Category::Unchanged => CategoryStats::default(),
            Category::Modified => self.modified,
            Category::Added => self.added,
            Category::Removed => self.removed,
        }
    }

    pub(crate) fn stats_mut(&mut self, category: Category) -> Option<&mut CategoryStats> {
        match category {
            Category::Unchanged => None,
            Category::Modified => Some(&mut self.modified),
            Category::Added => Some(&mut self.added),
            Category::Removed => Some(&mut self.removed),
        }
    }

    /// Total entries attempted across all categories
    pub fn total_attempted(&self) -> usize {
        self.modified.attempted + self.added.attempted + self.removed.attempted
    }

    /// Total entries copied across all categories
    pub fn total_copied(&self) -> usize {
        self.modified.copied + self.added.copied + self.removed.copied
    }

    /// Total entries that failed across all categories
    pub fn total_failed(&self) -> usize {
        self.modified.failed + self.added.failed + self.removed.failed
    }

    /// Total bytes written
    pub fn total_bytes(&self) -> u64 {
        self.modified.bytes_copied + self.added.bytes_copied + self.removed.bytes_copied
    }

    /// Relative paths of failed entries
    pub fn failed_paths(&self) -> Vec<&Path> {
        self.failures.iter().map(|f| f.path.as_path()).collect()
    }

    /// Whether every attempted entry was copied
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Progress information for long-running operations
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Current operation
    pub operation: String,
    /// Current item being processed
    pub current_item: Option<String>,
    /// Items processed so far
    pub processed: usize,
    /// Total items (if known)
    pub total: Option<usize>,
}
