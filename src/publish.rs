//! Publication of staged units into the deployment target.
//!
//! A [`Publisher`] is only invoked after the gate decides to proceed. It
//! works from the staging manifest and verifies every staged file against its
//! recorded digest before anything in the target is touched.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use crate::error::ReconcileError;
use crate::stage::{Manifest, files_dir, safe_relative, sha256_hex, write_atomic};

/// What a publisher did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Where the files went.
    pub destination: String,
    /// Paths written, in manifest order.
    pub written: Vec<String>,
}

/// Pushes staged files to a deployment target.
pub trait Publisher {
    /// Publish every file listed in `manifest` from `staging`.
    ///
    /// # Errors
    /// Returns an error if a staged file is missing or altered, or a write
    /// to the target fails.
    fn publish(&self, staging: &Path, manifest: &Manifest) -> Result<PublishReport, ReconcileError>;
}

/// Copies staged files into a target directory tree.
#[derive(Clone, Debug)]
pub struct DirectoryPublisher {
    target: PathBuf,
}

impl DirectoryPublisher {
    /// Publish into `target`.
    #[must_use]
    pub const fn new(target: PathBuf) -> Self {
        Self { target }
    }
}

impl Publisher for DirectoryPublisher {
    #[instrument(skip_all, fields(target = %self.target.display(), files = manifest.files.len()))]
    fn publish(&self, staging: &Path, manifest: &Manifest) -> Result<PublishReport, ReconcileError> {
        // Verify everything first so a tampered stage publishes nothing.
        let root = files_dir(staging);
        let mut contents = Vec::with_capacity(manifest.files.len());
        for file in &manifest.files {
            let rel = safe_relative(&file.path, &root)?;
            let src = root.join(&rel);
            let bytes = fs::read(&src).map_err(|e| ReconcileError::io("read", &src, e))?;
            let actual = sha256_hex(&bytes);
            if actual != file.sha256 {
                return Err(ReconcileError::StagedFileChanged {
                    path: src,
                    expected: file.sha256.clone(),
                    actual,
                });
            }
            contents.push((rel, bytes));
        }

        let mut written = Vec::with_capacity(contents.len());
        for (rel, bytes) in contents {
            write_atomic(&self.target.join(&rel), &bytes)?;
            written.push(rel.to_string_lossy().replace('\\', "/"));
        }

        info!(written = written.len(), "published staged files");
        Ok(PublishReport {
            destination: self.target.display().to_string(),
            written,
        })
    }
}
