//! Copying classified changes into an output directory
//!
//! [`ChangeMaterializer`] takes a finished [`ClassificationResult`] and copies
//! every changed path into `Modified/`, `Added/` or `Removed/` under an
//! output root, keeping the relative layout:
//!
//! - modified and added paths are copied from the next tree
//! - removed paths are copied from the previous tree
//!
//! ## Lifecycle
//!
//! ```text
//! Init -> (force delete) -> create output root -> OutputExists error
//!                                              \-> populate categories -> report
//! ```
//!
//! Creating the output root is all-or-nothing: if it already exists (and
//! was not force-deleted) nothing is copied. Once populating starts, a
//! failure to copy one entry is logged, recorded in the [`CopyReport`] and
//! does not stop the remaining copies.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dirdelta::{ChangeMaterializer, TreeComparator};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let prev = Path::new("v1");
//! let next = Path::new("v2");
//! let result = TreeComparator::new().compare(prev, next)?;
//!
//! let report = ChangeMaterializer::new("diff-v1-to-v2")
//!     .force_delete(true)
//!     .materialize(&result, prev, next)?;
//!
//! println!("Copied {} of {} entries", report.total_copied(), report.total_attempted());
//! # Ok(())
//! # }
//! ```

use crate::error::{DirDeltaError, Result};
use crate::snapshot::EntryFilter;
use crate::types::{Category, ClassificationResult, CopyFailure, CopyReport, ProgressInfo};
use crate::utils;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Copies classified changes into category folders
#[derive(Debug, Clone)]
pub struct ChangeMaterializer {
    out_root: PathBuf,
    force_delete: bool,
    follow_symlinks: bool,
    ignore_patterns: Vec<String>,
    parallel_workers: usize,
}

/// One entry to copy
struct CopyJob<'a> {
    category: Category,
    relative: &'a Path,
    source: PathBuf,
    dest: PathBuf,
}

impl ChangeMaterializer {
    /// Create a materializer writing into `out_root`
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Self {
            out_root: out_root.into(),
            force_delete: false,
            follow_symlinks: true,
            ignore_patterns: Vec::new(),
            parallel_workers: 1,
        }
    }

    /// Delete an existing output root before copying
    pub fn force_delete(mut self, force: bool) -> Self {
        self.force_delete = force;
        self
    }

    /// Copy what symbolic links point to instead of recreating the links
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Skip entries matching these globs inside copied directories
    ///
    /// Pass the patterns the classification was computed with, so ignored
    /// files under a copied directory stay out of the output.
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set number of parallel copy workers (minimum 1)
    pub fn parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    /// Output root this materializer writes into
    pub fn out_root(&self) -> &Path {
        &self.out_root
    }

    /// Copy every changed path of `result` into the output root
    ///
    /// # Errors
    ///
    /// - [`DirDeltaError::OutputExists`] if the output root already exists and
    ///   force delete was not requested; nothing is copied
    /// - [`DirDeltaError::OutputOverlapsInput`] if the output root is one of
    ///   the compared roots, lies inside one, or contains one
    /// - [`DirDeltaError::FileAccess`] if the output root or a category folder
    ///   cannot be created
    /// - [`DirDeltaError::InvalidPattern`] if an ignore pattern is malformed
    ///
    /// Failures copying individual entries are not errors; they are listed in
    /// the returned report.
    pub fn materialize(
        &self,
        result: &ClassificationResult,
        prev_root: &Path,
        next_root: &Path,
    ) -> Result<CopyReport> {
        self.materialize_with_progress::<fn(ProgressInfo)>(result, prev_root, next_root, None)
    }

    /// Like [`materialize`](Self::materialize), reporting each finished entry
    /// to `progress_callback`
    pub fn materialize_with_progress<F>(
        &self,
        result: &ClassificationResult,
        prev_root: &Path,
        next_root: &Path,
        progress_callback: Option<F>,
    ) -> Result<CopyReport>
    where
        F: Fn(ProgressInfo) + Send + Sync,
    {
        let filter = EntryFilter::from_patterns(&self.ignore_patterns)?;
        for input in [prev_root, next_root] {
            if utils::is_within(&self.out_root, input)? || utils::is_within(input, &self.out_root)? {
                return Err(DirDeltaError::OutputOverlapsInput {
                    output: self.out_root.clone(),
                    input: input.to_path_buf(),
                });
            }
        }

        if self.force_delete && utils::remove_path_if_exists(&self.out_root)? {
            debug!("Force deleted existing output {:?}", self.out_root);
        }
        self.create_out_root()?;

        let start = Instant::now();
        let jobs = self.plan(result, prev_root, next_root)?;
        let total = jobs.len();
        let processed = AtomicUsize::new(0);

        let run_job = |job: &CopyJob<'_>| {
            let outcome = utils::copy_entry(&job.source, &job.dest, job.relative, self.follow_symlinks, &filter);
            if let Err(e) = &outcome {
                warn!("Failed to copy {:?} ({}): {}", job.relative, job.category, e);
            }
            if let Some(ref callback) = progress_callback {
                callback(ProgressInfo {
                    operation: "Copying changes".to_string(),
                    current_item: Some(job.relative.to_string_lossy().into_owned()),
                    processed: processed.fetch_add(1, Ordering::Relaxed) + 1,
                    total: Some(total),
                });
            }
            outcome
        };

        let outcomes: Vec<Result<u64>> = if self.parallel_workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.parallel_workers)
                .build()
                .map_err(|e| DirDeltaError::ThreadPool(e.to_string()))?;
            pool.install(|| jobs.par_iter().map(run_job).collect())
        } else {
            jobs.iter().map(run_job).collect()
        };

        let mut report = CopyReport {
            out_root: self.out_root.clone(),
            ..Default::default()
        };
        let mut failures = Vec::new();
        for (job, outcome) in jobs.iter().zip(outcomes) {
            let Some(stats) = report.stats_mut(job.category) else {
                continue;
            };
            stats.attempted += 1;
            match outcome {
                Ok(bytes) => {
                    stats.copied += 1;
                    stats.bytes_copied += bytes;
                }
                Err(e) => {
                    stats.failed += 1;
                    failures.push(CopyFailure {
                        category: job.category,
                        path: job.relative.to_path_buf(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report.failures = failures;
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Materialized {} of {} entries into {:?} ({} failed, {})",
            report.total_copied(),
            report.total_attempted(),
            self.out_root,
            report.total_failed(),
            utils::format_bytes(report.total_bytes())
        );

        Ok(report)
    }

    /// Create the output root, failing if it already exists
    fn create_out_root(&self) -> Result<()> {
        if let Some(parent) = self.out_root.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DirDeltaError::file_access(parent, e))?;
        }
        match fs::create_dir(&self.out_root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(DirDeltaError::OutputExists(self.out_root.clone()))
            }
            Err(e) => Err(DirDeltaError::file_access(&self.out_root, e)),
        }
    }

    /// Create the needed category folders and list every copy to perform
    fn plan<'a>(
        &self,
        result: &'a ClassificationResult,
        prev_root: &Path,
        next_root: &Path,
    ) -> Result<Vec<CopyJob<'a>>> {
        let mut jobs = Vec::with_capacity(result.total_changes());

        for category in Category::CHANGES {
            let paths = result.paths(category);
            let Some(folder) = category.folder_name() else {
                continue;
            };
            if paths.is_empty() {
                continue;
            }

            let category_dir = self.out_root.join(folder);
            fs::create_dir_all(&category_dir).map_err(|e| DirDeltaError::file_access(&category_dir, e))?;

            let source_root = if category.sources_from_prev() { prev_root } else { next_root };
            jobs.extend(paths.iter().map(|relative| CopyJob {
                category,
                relative: relative.as_path(),
                source: source_root.join(relative),
                dest: category_dir.join(relative),
            }));
        }

        Ok(jobs)
    }
}
