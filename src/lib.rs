//! # dirdelta - What changed between two directory trees
//!
//! Compares a previous and a next version of a directory tree, classifies
//! every file as unchanged, modified, added or removed, and can copy the
//! differences into a separate folder for inspection.
//!
//! ## Overview
//!
//! dirdelta has two parts that run one after the other:
//!
//! - **[`TreeComparator`]** walks both roots in lockstep and produces a
//!   [`ClassificationResult`]: four sorted lists of paths relative to the roots
//! - **[`ChangeMaterializer`]** copies the modified, added and removed paths
//!   into `Modified/`, `Added/` and `Removed/` under an output root and returns
//!   a [`CopyReport`]
//!
//! The comparison finishes completely before any copy starts, and neither
//! step ever writes to the compared trees.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let prev = Path::new("./mod-1.0");
//! let next = Path::new("./mod-1.1");
//!
//! // Classify every file
//! let result = dirdelta::compare(prev, next)?;
//! println!(
//!     "{} unchanged, {} modified, {} added, {} removed",
//!     result.unchanged().len(),
//!     result.modified().len(),
//!     result.added().len(),
//!     result.removed().len(),
//! );
//!
//! // Copy the differences out
//! let report = dirdelta::materialize(&result, prev, next, Path::new("./changes"), false)?;
//! for failure in &report.failures {
//!     eprintln!("could not copy {}: {}", failure.path.display(), failure.error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Classification Rules
//!
//! - A name only in the previous tree is **removed**; a name only in the next
//!   tree is **added**. One-sided directories are expanded, so each file
//!   beneath them is listed individually. Directories are never entries of
//!   their own, so one holding no files contributes nothing.
//! - Files present on both sides are compared byte for byte: equal files are
//!   **unchanged**, anything else is **modified**. A file that cannot be
//!   read is logged as a warning and counted as **modified**.
//! - Directories present on both sides are recursed into.
//! - A name that is a file on one side and a directory on the other is
//!   **modified** at that path and not descended into.
//!
//! ## Advanced Usage
//!
//! ```rust,no_run
//! use dirdelta::{ChangeMaterializer, TreeComparator};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (prev, next) = (Path::new("a"), Path::new("b"));
//!
//! let result = TreeComparator::new()
//!     .ignore_patterns(vec![".git".to_string(), "*.tmp".to_string()])
//!     .follow_symlinks(false)
//!     .parallel_workers(8)
//!     .compare(prev, next)?;
//!
//! let report = ChangeMaterializer::new("out")
//!     .ignore_patterns(vec![".git".to_string(), "*.tmp".to_string()])
//!     .force_delete(true)
//!     .parallel_workers(8)
//!     .materialize(&result, prev, next)?;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, DirDeltaError>`. Missing roots, an
//! existing output directory and an output that overlaps a compared root are
//! fatal. Failing to copy a single entry is not: it is logged as a warning
//! and listed in [`CopyReport::failures`].
//!
//! ## Module Organization
//!
//! - [`comparator`]: the lockstep tree walk
//! - [`materializer`]: copying changes into category folders
//! - [`snapshot`]: single-level directory listings
//! - [`types`]: results, reports and progress payloads
//! - [`error`]: error types and handling

// Public API modules
pub mod comparator;
pub mod error;
pub mod materializer;
pub mod snapshot;
pub mod types;

// Internal modules (not part of public API)
mod utils;

// Re-export main types for convenience
pub use comparator::{list_tree, TreeComparator};
pub use error::{DirDeltaError, Result};
pub use materializer::ChangeMaterializer;
pub use snapshot::DirectorySnapshot;
pub use types::*;
pub use utils::{default_output_dir, format_bytes, root_name};

use std::path::Path;

/// Compare two directory trees with default settings
///
/// Equivalent to `TreeComparator::new().compare(prev_root, next_root)`.
///
/// # Errors
///
/// Fails with [`DirDeltaError::RootNotFound`] or
/// [`DirDeltaError::NotADirectory`] if either root is unusable.
pub fn compare(prev_root: &Path, next_root: &Path) -> Result<ClassificationResult> {
    TreeComparator::new().compare(prev_root, next_root)
}

/// Copy the changes of `result` into `out_root`
///
/// Modified and added paths are taken from `next_root`, removed paths from
/// `prev_root`. With `force_delete`, an existing `out_root` is deleted first;
/// otherwise an existing `out_root` fails with
/// [`DirDeltaError::OutputExists`] before anything is copied.
pub fn materialize(
    result: &ClassificationResult,
    prev_root: &Path,
    next_root: &Path,
    out_root: &Path,
    force_delete: bool,
) -> Result<CopyReport> {
    ChangeMaterializer::new(out_root)
        .force_delete(force_delete)
        .materialize(result, prev_root, next_root)
}
