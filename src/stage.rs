//! Staging of clean final texts.
//!
//! [`stage`] writes every clean artifact of each selected unit under
//! `files/` in a staging directory, then writes `manifest.json` next to it
//! listing every staged file with its SHA-256. Publication works from the manifest, so whatever is
//! published is exactly what was staged and reviewed.
//!
//! Staging is rebuilt from scratch on every run. A staging directory that
//! exists without a manifest is refused rather than cleared.

use std::fs;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use deltamerge_core::{Outcome, Reconciliation, UnitName};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::error::ReconcileError;

/// File name of the manifest inside the staging directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Subdirectory holding staged artifacts, kept apart from the manifest.
pub const FILES_DIR: &str = "files";

const MANIFEST_VERSION: u32 = 1;

/// One staged file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StagedFile {
    /// Path relative to the staged files root (and to the target tree).
    pub path: String,
    /// Unit the file belongs to.
    pub unit: UnitName,
    /// Outcome of this artifact alone.
    pub outcome: Outcome,
    /// Lowercase hex SHA-256 of the staged bytes.
    pub sha256: String,
    /// Size in bytes.
    pub bytes: u64,
}

/// Contents of `manifest.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// Format version.
    pub version: u32,
    /// Staged files in unit order.
    pub files: Vec<StagedFile>,
}

impl Manifest {
    /// Number of distinct units staged.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        let mut units: Vec<&UnitName> = self.files.iter().map(|f| &f.unit).collect();
        units.dedup();
        units.len()
    }
}

/// Root of the staged artifacts inside `staging`.
#[must_use]
pub fn files_dir(staging: &Path) -> PathBuf {
    staging.join(FILES_DIR)
}

/// Stage the final texts of `units` under `staging`.
///
/// Only artifacts whose own outcome is [`Outcome::Clean`] are written; a
/// no-real-change companion of a clean unit stays untouched in the target.
///
/// # Errors
/// Returns an error if the staging directory cannot be prepared, a unit name
/// is not a safe relative path, or a write fails.
#[instrument(skip_all, fields(staging = %staging.display(), units = units.len()))]
pub fn stage(staging: &Path, run: &Reconciliation, units: &[UnitName]) -> Result<Manifest, ReconcileError> {
    prepare_dir(staging)?;
    let root = files_dir(staging);

    let mut files = Vec::new();
    for name in units {
        let Some(texts) = run.final_texts.get(name) else {
            debug!(unit = %name, "no final text; not staged");
            continue;
        };
        for artifact in texts.artifacts() {
            if artifact.outcome != Outcome::Clean {
                debug!(path = %artifact.name, outcome = %artifact.outcome, "artifact unchanged; not staged");
                continue;
            }
            let rel = safe_relative(artifact.name.as_str(), &root)?;
            let dest = root.join(&rel);
            write_atomic(&dest, artifact.text.as_bytes())?;
            files.push(StagedFile {
                path: artifact.name.as_str().to_owned(),
                unit: name.clone(),
                outcome: artifact.outcome,
                sha256: sha256_hex(artifact.text.as_bytes()),
                bytes: artifact.text.len() as u64,
            });
        }
    }

    let manifest = Manifest {
        version: MANIFEST_VERSION,
        files,
    };
    let manifest_path = staging.join(MANIFEST_FILE);
    let json = serde_json::to_vec_pretty(&manifest).map_err(|source| ReconcileError::Manifest {
        path: manifest_path.clone(),
        source,
    })?;
    write_atomic(&manifest_path, &json)?;

    info!(files = manifest.files.len(), "staged clean units");
    Ok(manifest)
}

fn prepare_dir(staging: &Path) -> Result<(), ReconcileError> {
    if staging.is_dir() {
        if staging.join(MANIFEST_FILE).is_file() {
            fs::remove_dir_all(staging).map_err(|e| ReconcileError::io("clear", staging, e))?;
        } else {
            let mut entries =
                fs::read_dir(staging).map_err(|e| ReconcileError::io("read", staging, e))?;
            if entries.next().is_some() {
                return Err(ReconcileError::StagingNotEmpty {
                    path: staging.to_owned(),
                });
            }
        }
    }
    fs::create_dir_all(staging).map_err(|e| ReconcileError::io("create directory", staging, e))
}

/// Check that a unit name is a plain relative path and convert it.
///
/// # Errors
/// Returns [`ReconcileError::UnsafePath`] for empty, absolute or
/// parent-relative names.
pub fn safe_relative(name: &str, root: &Path) -> Result<PathBuf, ReconcileError> {
    let rel = Path::new(name);
    let plain = !name.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(rel.to_owned())
    } else {
        Err(ReconcileError::UnsafePath {
            name: name.to_owned(),
            root: root.to_owned(),
        })
    }
}

/// Write `bytes` to `path` through a synced temp file in the same directory.
///
/// # Errors
/// Returns an error on any filesystem failure.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReconcileError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| ReconcileError::io("create directory", dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| ReconcileError::io("create temp file in", dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| ReconcileError::io("write", tmp.path().to_owned(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ReconcileError::io("fsync", tmp.path().to_owned(), e))?;
    tmp.persist(path)
        .map_err(|e| ReconcileError::io("rename into", path, e.error))?;
    Ok(())
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(hex, "{b:02x}");
    }
    hex
}
