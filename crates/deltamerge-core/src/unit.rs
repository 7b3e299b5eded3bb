//! Unit snapshot sets: the passive inputs of a reconciliation run.
//!
//! A [`Unit`] is one independently mergeable artifact (a source file, plus an
//! optional companion such as a metadata sidecar). For each artifact we hold
//! three snapshots:
//!
//! - **before**: content at the delta's parent point
//! - **after**: content at the delta's result point
//! - **target**: content currently held by the deployment target
//!
//! Each snapshot is an `Option<String>`: `None` means the artifact is
//! legitimately absent at that point, which is never the same thing as an
//! empty file. Absence routes the unit out of the merge (see
//! [`crate::batch`]); it is never synthesized as empty text.
//!
//! Snapshot text must already be line-feed normalized when it reaches this
//! crate.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UnitName
// ---------------------------------------------------------------------------

/// Stable identifier of a unit (typically a repository-relative path).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitName(String);

impl UnitName {
    /// Wrap a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UnitName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// SnapshotRole
// ---------------------------------------------------------------------------

/// Which of the three snapshots a value refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotRole {
    /// The delta's parent point.
    Before,
    /// The delta's result point.
    After,
    /// The deployment target's current state.
    Target,
}

impl SnapshotRole {
    /// All roles required for a merge, in canonical order.
    pub const REQUIRED: [Self; 3] = [Self::Before, Self::After, Self::Target];
}

impl fmt::Display for SnapshotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
            Self::Target => write!(f, "target"),
        }
    }
}

// ---------------------------------------------------------------------------
// SnapshotSet
// ---------------------------------------------------------------------------

/// The three snapshots of one artifact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotSet {
    /// Content at the delta's parent, `None` if the artifact did not exist.
    pub before: Option<String>,
    /// Content at the delta's result, `None` if the artifact did not exist.
    pub after: Option<String>,
    /// Content on the deployment target, `None` if not present there.
    pub target: Option<String>,
}

impl SnapshotSet {
    /// Build a set where every snapshot is present.
    pub fn present(
        before: impl Into<String>,
        after: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            before: Some(before.into()),
            after: Some(after.into()),
            target: Some(target.into()),
        }
    }

    /// Borrow the snapshot for `role`.
    #[must_use]
    pub fn get(&self, role: SnapshotRole) -> Option<&str> {
        match role {
            SnapshotRole::Before => self.before.as_deref(),
            SnapshotRole::After => self.after.as_deref(),
            SnapshotRole::Target => self.target.as_deref(),
        }
    }

    /// Roles whose snapshot is absent, in canonical order.
    #[must_use]
    pub fn missing_roles(&self) -> Vec<SnapshotRole> {
        SnapshotRole::REQUIRED
            .into_iter()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }

    /// Borrow all three snapshots when every one is present.
    #[must_use]
    pub fn complete(&self) -> Option<CompleteSnapshots<'_>> {
        Some(CompleteSnapshots {
            before: self.before.as_deref()?,
            after: self.after.as_deref()?,
            target: self.target.as_deref()?,
        })
    }
}

/// Borrowed view of a [`SnapshotSet`] with all three snapshots present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompleteSnapshots<'a> {
    /// Delta parent text.
    pub before: &'a str,
    /// Delta result text.
    pub after: &'a str,
    /// Target text.
    pub target: &'a str,
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// A companion artifact (e.g. a metadata sidecar) merged alongside its unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Companion {
    /// Name of the companion artifact (usually its own relative path).
    pub name: UnitName,
    /// The companion's snapshots.
    pub snapshots: SnapshotSet,
}

/// One mergeable artifact and its optional companion.
///
/// Constructed once per run from the collaborators' outputs and not mutated
/// afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    /// Stable unit name.
    pub name: UnitName,
    /// Snapshots of the primary artifact.
    pub snapshots: SnapshotSet,
    /// Optional companion artifact.
    pub companion: Option<Companion>,
}

impl Unit {
    /// Create a unit without a companion.
    pub fn new(name: impl Into<UnitName>, snapshots: SnapshotSet) -> Self {
        Self {
            name: name.into(),
            snapshots,
            companion: None,
        }
    }

    /// Attach a companion artifact.
    #[must_use]
    pub fn with_companion(mut self, name: impl Into<UnitName>, snapshots: SnapshotSet) -> Self {
        self.companion = Some(Companion {
            name: name.into(),
            snapshots,
        });
        self
    }
}
