//! Recursive lockstep comparison of two directory trees
//!
//! [`TreeComparator`] walks a previous and a next root side by side. At each
//! level it lists both directories once, splits the entry names into
//! left-only, right-only and common groups, and classifies them:
//!
//! - left-only entries are **removed**; a left-only directory contributes
//!   every file beneath it individually
//! - right-only entries are **added**, expanded the same way
//! - common files are compared byte for byte and become **unchanged** or
//!   **modified**
//! - common directories are recursed into
//! - a name that is a file on one side and a directory on the other is
//!   **modified** at that path and not descended into
//!
//! Directories are never entries of their own: a directory with no files
//! beneath it contributes nothing on either side. A common file that cannot
//! be read is logged and reported as **modified**, since its contents cannot
//! be shown to match.
//!
//! Each recursive call returns its own [`ClassificationResult`], which the
//! caller merges. Nothing on disk is modified.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dirdelta::TreeComparator;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let result = TreeComparator::new()
//!     .ignore_patterns(vec!["*.tmp".to_string()])
//!     .parallel_workers(4)
//!     .compare(Path::new("release-1.0"), Path::new("release-1.1"))?;
//!
//! println!("{} modified, {} added", result.modified().len(), result.added().len());
//! # Ok(())
//! # }
//! ```

use crate::error::{DirDeltaError, Result};
use crate::snapshot::{DirectorySnapshot, EntryFilter};
use crate::types::{Category, ClassificationResult, EntryKind};
use rayon::prelude::*;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Compares two directory trees
#[derive(Debug, Clone)]
pub struct TreeComparator {
    follow_symlinks: bool,
    ignore_patterns: Vec<String>,
    parallel_workers: usize,
}

impl Default for TreeComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeComparator {
    /// Create a comparator with default settings
    ///
    /// Symbolic links are followed, nothing is ignored and the walk runs on
    /// the calling thread.
    pub fn new() -> Self {
        Self {
            follow_symlinks: true,
            ignore_patterns: Vec::new(),
            parallel_workers: 1,
        }
    }

    /// Set symbolic link following behavior
    ///
    /// When disabled, links are compared by their target path and never
    /// descended into.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set ignore patterns
    ///
    /// Glob patterns matched against each entry's name and its relative
    /// path. Matching entries are skipped on both sides and appear in no
    /// category.
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set number of parallel workers (minimum 1)
    ///
    /// With more than one worker, sibling subdirectories are compared
    /// concurrently on a dedicated thread pool.
    pub fn parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    /// Compare `prev_root` against `next_root`
    ///
    /// # Errors
    ///
    /// - [`DirDeltaError::RootNotFound`] / [`DirDeltaError::NotADirectory`] if
    ///   either root is missing or not a directory
    /// - [`DirDeltaError::InvalidPattern`] if an ignore pattern is malformed
    /// - [`DirDeltaError::FileAccess`] if a directory cannot be listed or a
    ///   file cannot be read for comparison
    pub fn compare(&self, prev_root: &Path, next_root: &Path) -> Result<ClassificationResult> {
        check_root(prev_root)?;
        check_root(next_root)?;

        let filter = EntryFilter::from_patterns(&self.ignore_patterns)?;
        let walk = Walk {
            follow_symlinks: self.follow_symlinks,
            parallel: self.parallel_workers > 1,
            filter: &filter,
        };

        let start = Instant::now();
        debug!(
            "Comparing {:?} -> {:?} ({} workers)",
            prev_root, next_root, self.parallel_workers
        );

        let result = if walk.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.parallel_workers)
                .build()
                .map_err(|e| DirDeltaError::ThreadPool(e.to_string()))?;
            pool.install(|| walk.compare_dirs(prev_root, next_root, Path::new("")))?
        } else {
            walk.compare_dirs(prev_root, next_root, Path::new(""))?
        };
        let result = result.finish();

        info!(
            "Compared trees in {:?}: {} unchanged, {} modified, {} added, {} removed",
            start.elapsed(),
            result.unchanged().len(),
            result.modified().len(),
            result.added().len(),
            result.removed().len()
        );

        Ok(result)
    }

}

/// Ensure a comparison root exists and is a directory
fn check_root(root: &Path) -> Result<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DirDeltaError::NotADirectory(root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(DirDeltaError::RootNotFound(root.to_path_buf()))
        }
        Err(e) => Err(DirDeltaError::file_access(root, e)),
    }
}

/// Per-run walk settings shared by every recursion level
struct Walk<'a> {
    follow_symlinks: bool,
    parallel: bool,
    filter: &'a EntryFilter,
}

impl Walk<'_> {
    /// Compare one pair of directories and everything beneath them
    fn compare_dirs(&self, prev_dir: &Path, next_dir: &Path, relative: &Path) -> Result<ClassificationResult> {
        let left = DirectorySnapshot::read_filtered(prev_dir, relative, self.follow_symlinks, self.filter)?;
        let right = DirectorySnapshot::read_filtered(next_dir, relative, self.follow_symlinks, self.filter)?;

        let mut result = ClassificationResult::default();
        let mut common_dirs: Vec<&OsStr> = Vec::new();

        for (name, kind) in left.only_in(&right) {
            self.expand(&left, name, kind, relative, Category::Removed, &mut result)?;
        }
        for (name, kind) in right.only_in(&left) {
            self.expand(&right, name, kind, relative, Category::Added, &mut result)?;
        }

        for (name, left_kind, right_kind) in left.common_with(&right) {
            let path = relative.join(name);
            if left_kind.is_dir() && right_kind.is_dir() {
                common_dirs.push(name);
                continue;
            }
            // A kind mismatch is reported at this path, never descended into
            let category = if left_kind != right_kind {
                Category::Modified
            } else {
                match left.same_entry(&right, name) {
                    Ok(true) => Category::Unchanged,
                    Ok(false) => Category::Modified,
                    Err(e) if e.is_recoverable() => {
                        warn!("Cannot compare {:?}, reporting it as modified: {}", path, e);
                        Category::Modified
                    }
                    Err(e) => return Err(e),
                }
            };
            trace!("{}: {:?}", category, path);
            result.push(category, path);
        }

        let compare_child = |name: &&OsStr| {
            self.compare_dirs(&prev_dir.join(name), &next_dir.join(name), &relative.join(name))
        };
        let children: Vec<ClassificationResult> = if self.parallel {
            common_dirs.par_iter().map(compare_child).collect::<Result<_>>()?
        } else {
            common_dirs.iter().map(compare_child).collect::<Result<_>>()?
        };
        for child in children {
            result.merge(child);
        }

        Ok(result)
    }

    /// Record a one-sided entry, expanding directories to the files beneath them
    fn expand(
        &self,
        snapshot: &DirectorySnapshot,
        name: &OsStr,
        kind: EntryKind,
        relative: &Path,
        category: Category,
        result: &mut ClassificationResult,
    ) -> Result<()> {
        let path = relative.join(name);
        if !kind.is_dir() {
            trace!("{}: {:?}", category, path);
            result.push(category, path);
            return Ok(());
        }

        let dir = snapshot.dir().join(name);
        let inner = DirectorySnapshot::read_filtered(&dir, &path, self.follow_symlinks, self.filter)?;
        for (child, child_kind) in inner.entries() {
            self.expand(&inner, child, child_kind, &path, category, result)?;
        }
        Ok(())
    }
}

/// Relative paths of every non-directory entry under a single root
///
/// These are the paths the comparator classifies. Comparing a tree against
/// an empty directory reports exactly these paths as added.
pub fn list_tree(root: &Path, follow_symlinks: bool) -> Result<Vec<PathBuf>> {
    check_root(root)?;
    let filter = EntryFilter::default();
    let walk = Walk {
        follow_symlinks,
        parallel: false,
        filter: &filter,
    };
    let snapshot = DirectorySnapshot::read(root, follow_symlinks)?;
    let mut result = ClassificationResult::default();
    for (name, kind) in snapshot.entries() {
        walk.expand(&snapshot, name, kind, Path::new(""), Category::Added, &mut result)?;
    }
    Ok(result.finish().added().to_vec())
}
