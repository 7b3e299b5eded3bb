//! Publish gate and terminal run status.
//!
//! [`decide`] is a pure function of a [`ReconciliationResult`] and the
//! requested [`PublishMode`]. It never mutates or discards per-unit results.
//!
//! Safety invariant: while any unit is in conflict, publication is refused
//! outright, including for the clean subset.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::batch::{BatchError, ReconciliationResult};
use crate::unit::UnitName;

/// What the caller wants done with the clean units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishMode {
    /// Show what would be published. Never publishes.
    #[default]
    Preview,
    /// Publish the clean units if no unit is in conflict.
    Publish,
    /// Report the full classification. Never publishes.
    DryRun,
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preview => write!(f, "preview"),
            Self::Publish => write!(f, "publish"),
            Self::DryRun => write!(f, "dry-run"),
        }
    }
}

/// Why the gate decided the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    /// Preview mode; the clean set is for display only.
    PreviewOnly,
    /// Dry-run mode; classification is reported, nothing is published.
    DryRun,
    /// At least one unit is in conflict.
    ConflictsOutstanding,
    /// No conflicts, but no clean unit either.
    NothingToPublish,
    /// Clean units are ready and nothing conflicts.
    Ready,
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreviewOnly => write!(f, "preview only"),
            Self::DryRun => write!(f, "dry run"),
            Self::ConflictsOutstanding => write!(f, "conflicts outstanding"),
            Self::NothingToPublish => write!(f, "nothing to publish"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Output of [`decide`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublishDecision {
    /// Whether publication proceeds.
    pub proceed: bool,
    /// Units eligible for publication (display-only unless `proceed`).
    ///
    /// Empty when publication is refused because of conflicts.
    pub units_to_publish: Vec<UnitName>,
    /// Why.
    pub reason: GateReason,
}

/// Decide whether publication proceeds.
#[must_use]
pub fn decide(result: &ReconciliationResult, mode: PublishMode) -> PublishDecision {
    let (proceed, units_to_publish, reason) = match mode {
        PublishMode::Preview => (false, result.clean.clone(), GateReason::PreviewOnly),
        PublishMode::DryRun => (false, result.clean.clone(), GateReason::DryRun),
        PublishMode::Publish if result.has_conflicts() => {
            (false, Vec::new(), GateReason::ConflictsOutstanding)
        }
        PublishMode::Publish if result.clean.is_empty() => {
            (false, Vec::new(), GateReason::NothingToPublish)
        }
        PublishMode::Publish => (true, result.clean.clone(), GateReason::Ready),
    };
    PublishDecision {
        proceed,
        units_to_publish,
        reason,
    }
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Terminal state of a run, mapped to a stable process exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Everything clean (or published). Exit code 0.
    Success,
    /// At least one unit needs attention. Exit code 1.
    ConflictsPresent,
    /// The input was unusable (no units, all skipped). Exit code 2.
    PreconditionFailure,
}

impl RunStatus {
    /// Status of a completed run.
    #[must_use]
    pub fn from_result(result: &ReconciliationResult) -> Self {
        if result.has_conflicts() {
            Self::ConflictsPresent
        } else {
            Self::Success
        }
    }

    /// Process exit code.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::ConflictsPresent => 1,
            Self::PreconditionFailure => 2,
        }
    }
}

impl From<&BatchError> for RunStatus {
    fn from(_: &BatchError) -> Self {
        Self::PreconditionFailure
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ConflictsPresent => write!(f, "conflicts present"),
            Self::PreconditionFailure => write!(f, "precondition failure"),
        }
    }
}
