//! Error types for the reconcile pipeline.
//!
//! [`ReconcileError`] covers everything outside the pure engine: reading
//! snapshots, talking to git, staging and publishing. Messages are written for
//! the operator at the terminal: each says what went wrong and, where there is
//! an obvious next step, how to fix it.

use std::path::PathBuf;

use deltamerge_core::{BatchError, SnapshotRole};
use thiserror::Error;

/// Errors returned by snapshot sources, staging, publication and the runner.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The batch as a whole was unusable.
    #[error("{0}\n  To fix: check that the before/after inputs touch at least one file present in the target")]
    Batch(#[from] BatchError),

    /// A snapshot root directory does not exist.
    #[error("{role} directory not found: {}\n  To fix: pass an existing directory with --{role}", path.display())]
    MissingRoot {
        /// Which snapshot the directory was meant to supply.
        role: SnapshotRole,
        /// The missing path.
        path: PathBuf,
    },

    /// A snapshot file is not valid UTF-8.
    #[error("{} is not valid UTF-8 (invalid byte at offset {offset})\n  To fix: re-encode the file as UTF-8", path.display())]
    NotUtf8 {
        /// The offending file (or `rev:path` for git snapshots).
        path: PathBuf,
        /// Byte offset of the first invalid sequence.
        offset: usize,
    },

    /// An include pattern is not a valid glob.
    #[error("invalid include pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// A unit name would escape the directory it is written into.
    #[error("refusing to write unit `{name}` outside {}", root.display())]
    UnsafePath {
        /// The unit name.
        name: String,
        /// The directory being written.
        root: PathBuf,
    },

    /// The staging directory holds files this tool did not write.
    #[error("staging directory {} is not empty and has no manifest.json\n  To fix: remove it or pass a different --staging directory", path.display())]
    StagingNotEmpty {
        /// The staging directory.
        path: PathBuf,
    },

    /// A staged file no longer matches the digest recorded in the manifest.
    #[error("staged file {} changed since it was staged (expected sha256 {expected}, found {actual})\n  To fix: re-run reconcile to restage", path.display())]
    StagedFileChanged {
        /// The staged file.
        path: PathBuf,
        /// Digest from the manifest.
        expected: String,
        /// Digest of the file on disk.
        actual: String,
    },

    /// A git subprocess failed.
    #[error("`{command}` failed (exit code {}): {stderr}", exit_code.map_or_else(|| "none".to_owned(), |c| c.to_string()))]
    Git {
        /// The command line that was run.
        command: String,
        /// Captured stderr.
        stderr: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
    },

    /// The manifest could not be encoded.
    #[error("manifest {}: {source}", path.display())]
    Manifest {
        /// Path of the manifest.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A filesystem operation failed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        /// What was being done (`read`, `write`, `create directory`, ...).
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ReconcileError {
    /// Shorthand for [`ReconcileError::Io`].
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
