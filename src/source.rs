//! Snapshot sources: where `before`, `after` and `target` texts come from.
//!
//! A [`SnapshotSource`] turns some external layout into the engine's
//! [`Unit`] list. Two are provided:
//!
//! - [`DirectorySource`]: three directory trees on disk.
//! - [`GitDeltaSource`]: `before`/`after` from a git commit and its first
//!   parent, `target` from a directory tree.
//!
//! Both route every file through [`normalize`](crate::normalize) and group
//! paths into units with the same [`UnitLayout`] rules.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use deltamerge_core::{SnapshotRole, SnapshotSet, Unit};
use glob::{MatchOptions, Pattern};
use tracing::{debug, instrument};

use crate::config::LayoutConfig;
use crate::error::ReconcileError;
use crate::normalize::{normalize, read_snapshot};

/// Produces the units of one reconciliation run.
pub trait SnapshotSource {
    /// Short human-readable description, for logs and reports.
    fn describe(&self) -> String;

    /// Load every unit, sorted by name.
    ///
    /// # Errors
    /// Returns an error if a root is missing or a snapshot cannot be read.
    fn load_units(&self) -> Result<Vec<Unit>, ReconcileError>;
}

// ---------------------------------------------------------------------------
// UnitLayout
// ---------------------------------------------------------------------------

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Rules mapping relative file paths onto units.
#[derive(Clone, Debug)]
pub struct UnitLayout {
    include: Vec<Pattern>,
    companion_suffix: String,
}

/// Paths making up one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitPaths {
    /// The primary file, which names the unit.
    pub primary: String,
    /// The companion file riding along with it, if any.
    pub companion: Option<String>,
}

impl UnitLayout {
    /// Compile include globs.
    ///
    /// # Errors
    /// Returns [`ReconcileError::InvalidPattern`] for a malformed glob.
    pub fn new(include: &[String], companion_suffix: &str) -> Result<Self, ReconcileError> {
        let include = include
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ReconcileError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.msg.to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            include,
            companion_suffix: companion_suffix.to_owned(),
        })
    }

    /// Layout described by the `[layout]` config table.
    ///
    /// # Errors
    /// Returns [`ReconcileError::InvalidPattern`] for a malformed glob.
    pub fn from_config(config: &LayoutConfig) -> Result<Self, ReconcileError> {
        Self::new(&config.include, &config.companion_suffix)
    }

    /// Returns `true` if `path` matches any include pattern.
    #[must_use]
    pub fn includes(&self, path: &str) -> bool {
        self.include.iter().any(|p| p.matches_with(path, MATCH_OPTIONS))
    }

    /// The primary a companion path belongs to, judged by name alone.
    #[must_use]
    pub fn primary_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.companion_suffix.is_empty() {
            return None;
        }
        path.strip_suffix(self.companion_suffix.as_str())
            .filter(|primary| !primary.is_empty() && !primary.ends_with('/'))
    }

    /// Group paths into units, sorted by primary path.
    ///
    /// A path ending in the companion suffix attaches to its primary when the
    /// primary is among `paths` or `primary_exists` reports it; otherwise it is
    /// an ordinary file and forms its own unit. Companions are included or
    /// excluded with their primary.
    #[must_use]
    pub fn group<I>(&self, paths: I, primary_exists: impl Fn(&str) -> bool) -> Vec<UnitPaths>
    where
        I: IntoIterator<Item = String>,
    {
        let all: BTreeSet<String> = paths.into_iter().collect();
        let mut units: BTreeMap<&str, Option<&str>> = BTreeMap::new();

        for path in &all {
            let owner = self
                .primary_of(path)
                .filter(|primary| all.contains(*primary) || primary_exists(*primary));
            match owner {
                Some(primary) => {
                    if self.includes(primary) {
                        units.insert(primary, Some(path.as_str()));
                    }
                }
                None => {
                    if self.includes(path) {
                        units.entry(path.as_str()).or_insert(None);
                    }
                }
            }
        }

        units
            .into_iter()
            .map(|(primary, companion)| UnitPaths {
                primary: primary.to_owned(),
                companion: companion.map(str::to_owned),
            })
            .collect()
    }
}

/// Build a unit from its paths and a per-path snapshot reader.
fn assemble<F>(paths: &UnitPaths, mut read: F) -> Result<Unit, ReconcileError>
where
    F: FnMut(&str) -> Result<SnapshotSet, ReconcileError>,
{
    let mut unit = Unit::new(paths.primary.as_str(), read(&paths.primary)?);
    if let Some(companion) = &paths.companion {
        unit = unit.with_companion(companion.as_str(), read(companion)?);
    }
    Ok(unit)
}

// ---------------------------------------------------------------------------
// DirectorySource
// ---------------------------------------------------------------------------

/// Three directory trees: `before/`, `after/` and `target/`.
///
/// Units are the union of files under `before/` and `after/`. A file absent
/// from one tree yields an absent snapshot for that role, which the batch
/// runner reports as a skip.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    before: PathBuf,
    after: PathBuf,
    target: PathBuf,
    layout: UnitLayout,
}

impl DirectorySource {
    /// Create a source over three roots.
    #[must_use]
    pub const fn new(before: PathBuf, after: PathBuf, target: PathBuf, layout: UnitLayout) -> Self {
        Self {
            before,
            after,
            target,
            layout,
        }
    }

    fn read_set(&self, rel: &str) -> Result<SnapshotSet, ReconcileError> {
        Ok(SnapshotSet {
            before: read_snapshot(&self.before.join(rel))?,
            after: read_snapshot(&self.after.join(rel))?,
            target: read_snapshot(&self.target.join(rel))?,
        })
    }
}

impl SnapshotSource for DirectorySource {
    fn describe(&self) -> String {
        format!(
            "directories before={} after={} target={}",
            self.before.display(),
            self.after.display(),
            self.target.display()
        )
    }

    #[instrument(skip_all, fields(before = %self.before.display(), after = %self.after.display()))]
    fn load_units(&self) -> Result<Vec<Unit>, ReconcileError> {
        require_dir(SnapshotRole::Before, &self.before)?;
        require_dir(SnapshotRole::After, &self.after)?;
        require_dir(SnapshotRole::Target, &self.target)?;

        let mut paths = list_files(&self.before)?;
        paths.extend(list_files(&self.after)?);

        let grouped = self.layout.group(paths, |_| false);
        debug!(units = grouped.len(), "grouped directory paths");
        grouped
            .iter()
            .map(|p| assemble(p, |rel| self.read_set(rel)))
            .collect()
    }
}

fn require_dir(role: SnapshotRole, path: &Path) -> Result<(), ReconcileError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ReconcileError::MissingRoot {
            role,
            path: path.to_owned(),
        })
    }
}

/// Every regular file under `root`, as a `/`-separated relative path.
///
/// # Errors
/// Returns an error if a directory under `root` cannot be read.
pub fn list_files(root: &Path) -> Result<BTreeSet<String>, ReconcileError> {
    let pattern = format!(
        "{}/**/*",
        Pattern::escape(&root.to_string_lossy()).trim_end_matches('/')
    );
    let entries = glob::glob_with(&pattern, MATCH_OPTIONS).map_err(|e| {
        ReconcileError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.msg.to_owned(),
        }
    })?;

    let mut files = BTreeSet::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_owned();
            ReconcileError::io("list", path, e.into())
        })?;
        if !path.is_file() {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(root) {
            files.insert(to_slash(rel));
        }
    }
    Ok(files)
}

fn to_slash(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// GitDeltaSource
// ---------------------------------------------------------------------------

/// `before`/`after` from a commit and its first parent; `target` from disk.
///
/// Only paths touched by the commit become units. The commit must have a
/// parent.
#[derive(Clone, Debug)]
pub struct GitDeltaSource {
    repo: PathBuf,
    rev: String,
    target: PathBuf,
    layout: UnitLayout,
}

impl GitDeltaSource {
    /// Create a source for `rev` in `repo`.
    #[must_use]
    pub fn new(repo: PathBuf, rev: impl Into<String>, target: PathBuf, layout: UnitLayout) -> Self {
        Self {
            repo,
            rev: rev.into(),
            target,
            layout,
        }
    }

    fn parent(&self) -> String {
        format!("{}^", self.rev)
    }

    /// Paths touched between the parent and `rev`.
    fn touched_paths(&self) -> Result<Vec<String>, ReconcileError> {
        let parent = self.parent();
        let out = git_ok(
            &self.repo,
            &["diff", "--name-only", "--no-renames", "-z", &parent, &self.rev],
        )?;
        Ok(out
            .split(|b| *b == 0)
            .filter(|p| !p.is_empty())
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect())
    }

    fn blob_exists(&self, rev: &str, path: &str) -> bool {
        git(&self.repo, &["cat-file", "-e", &format!("{rev}:{path}")])
            .is_ok_and(|out| out.status.success())
    }

    fn read_blob(&self, rev: &str, path: &str) -> Result<Option<String>, ReconcileError> {
        if !self.blob_exists(rev, path) {
            return Ok(None);
        }
        let spec = format!("{rev}:{path}");
        let bytes = git_ok(&self.repo, &["cat-file", "blob", &spec])?;
        normalize(&bytes, Path::new(&spec)).map(Some)
    }

    fn read_set(&self, rel: &str) -> Result<SnapshotSet, ReconcileError> {
        Ok(SnapshotSet {
            before: self.read_blob(&self.parent(), rel)?,
            after: self.read_blob(&self.rev, rel)?,
            target: read_snapshot(&self.target.join(rel))?,
        })
    }
}

impl SnapshotSource for GitDeltaSource {
    fn describe(&self) -> String {
        format!(
            "git {} in {} target={}",
            self.rev,
            self.repo.display(),
            self.target.display()
        )
    }

    #[instrument(skip_all, fields(rev = %self.rev, repo = %self.repo.display()))]
    fn load_units(&self) -> Result<Vec<Unit>, ReconcileError> {
        require_dir(SnapshotRole::Target, &self.target)?;
        let touched = self.touched_paths()?;
        debug!(paths = touched.len(), "paths touched by commit");

        let parent = self.parent();
        let grouped = self.layout.group(touched, |primary| {
            self.blob_exists(&self.rev, primary) || self.blob_exists(&parent, primary)
        });
        grouped
            .iter()
            .map(|p| assemble(p, |rel| self.read_set(rel)))
            .collect()
    }
}

/// Run git in `dir`.
fn git(dir: &Path, args: &[&str]) -> Result<Output, ReconcileError> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| ReconcileError::io("run git in", dir, e))
}

/// Run git in `dir` and return stdout, or a [`ReconcileError::Git`].
fn git_ok(dir: &Path, args: &[&str]) -> Result<Vec<u8>, ReconcileError> {
    let out = git(dir, args)?;
    if out.status.success() {
        Ok(out.stdout)
    } else {
        Err(ReconcileError::Git {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            exit_code: out.status.code(),
        })
    }
}

impl fmt::Display for UnitPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.companion {
            Some(c) => write!(f, "{} (+{c})", self.primary),
            None => write!(f, "{}", self.primary),
        }
    }
}
