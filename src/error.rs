//! Error types for dirdelta
//!
//! This module defines all error types that can occur while comparing
//! directory trees or materializing their differences. Fatal errors abort the
//! operation that raised them; per-entry copy failures are captured into the
//! [`CopyReport`](crate::types::CopyReport) instead of being propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the dirdelta library
pub type Result<T> = std::result::Result<T, DirDeltaError>;

/// Main error type for all dirdelta operations
#[derive(Debug, Error)]
pub enum DirDeltaError {
    /// I/O errors without a more specific path context
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path
    #[error("Cannot access {path:?}: {source}")]
    FileAccess {
        /// Path that could not be read, written or copied
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Errors during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A comparison root does not exist
    #[error("Directory not found: {0:?}")]
    RootNotFound(PathBuf),

    /// A comparison root exists but is not a directory
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// Output directory already exists and force delete was not requested
    #[error("Output directory already exists: {0:?}")]
    OutputExists(PathBuf),

    /// Output directory is, contains, or lies inside one of the compared roots
    #[error("Output directory {output:?} overlaps compared directory {input:?}")]
    OutputOverlapsInput {
        /// Requested output root
        output: PathBuf,
        /// Compared root it overlaps
        input: PathBuf,
    },

    /// Ignore pattern could not be parsed
    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(String),

    /// Thread pool error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DirDeltaError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        DirDeltaError::Internal(msg.into())
    }

    /// Attach a path to an I/O error
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DirDeltaError::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Check if this error means a comparison root is missing or unusable
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirDeltaError::RootNotFound(_) | DirDeltaError::NotADirectory(_)
        )
    }

    /// Check if this error is recoverable
    ///
    /// Only per-entry access failures are; the materializer records them and
    /// carries on with the remaining entries.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DirDeltaError::FileAccess { .. })
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            DirDeltaError::RootNotFound(path) => {
                format!("Directory {:?} does not exist. Check the path and try again.", path)
            }
            DirDeltaError::NotADirectory(path) => {
                format!("{:?} is not a directory. Both compared paths must be directories.", path)
            }
            DirDeltaError::OutputExists(path) => {
                format!(
                    "The changes directory {:?} already exists. \
                     Delete it, choose another one, or pass --force-delete.",
                    path
                )
            }
            DirDeltaError::OutputOverlapsInput { output, input } => {
                format!(
                    "Refusing to use {:?} for changes: it overlaps {:?}, which is being compared. \
                     Choose a changes directory outside both compared directories.",
                    output, input
                )
            }
            _ => self.to_string(),
        }
    }
}
