//! Reconciliation batch runner.
//!
//! [`run_all`] walks the units in caller order. Units missing a required
//! snapshot are skipped (a routing decision, not an error). Every other unit
//! is merged, classified and recorded in exactly one of three buckets:
//! `clean`, `no_real_change` or `conflicted`.
//!
//! One unit's conflict never blocks another unit's merge, and nothing aborts
//! mid-batch: a run always yields a complete report. The only failures are
//! precondition failures on the batch as a whole (no units, every unit
//! skipped, duplicate names).
//!
//! State is accumulated in a [`ResultBuilder`] owned by one call, so runs are
//! independent of each other.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::classify::{Outcome, WhitespaceRule, classify};
use crate::merge::{ConflictHunk, MergeOptions, merge_with};
use crate::unit::{SnapshotRole, SnapshotSet, Unit, UnitName};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Settings shared by every unit of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Merge settings (conflict style, marker labels).
    pub merge: MergeOptions,
    /// Whitespace equivalence rule used by the classifier.
    pub whitespace: WhitespaceRule,
}

// ---------------------------------------------------------------------------
// Skips
// ---------------------------------------------------------------------------

/// A unit (or companion) excluded from merging because snapshots are absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    /// Name of the skipped unit or companion.
    pub name: UnitName,
    /// Every absent role, in canonical order.
    pub missing: Vec<SnapshotRole>,
}

impl fmt::Display for SkippedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roles: Vec<String> = self.missing.iter().map(ToString::to_string).collect();
        write!(f, "{} (missing {})", self.name, roles.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Per-artifact output
// ---------------------------------------------------------------------------

/// Final text and classification of one artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactText {
    /// Artifact name.
    pub name: UnitName,
    /// Outcome of this artifact alone.
    pub outcome: Outcome,
    /// Text to stage for this artifact.
    #[serde(skip)]
    pub text: String,
    /// Conflict blocks (empty unless `Conflict`).
    pub hunks: Vec<ConflictHunk>,
}

/// Final texts of one processed unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnitTexts {
    /// The primary artifact.
    pub primary: ArtifactText,
    /// The companion artifact, when it was merged.
    pub companion: Option<ArtifactText>,
}

impl UnitTexts {
    /// Combined outcome of the unit.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.companion
            .as_ref()
            .map_or(self.primary.outcome, |c| self.primary.outcome.combine(c.outcome))
    }

    /// Total conflict blocks across primary and companion.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.primary.hunks.len() + self.companion.as_ref().map_or(0, |c| c.hunks.len())
    }

    /// Iterate over the merged artifacts.
    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactText> {
        std::iter::once(&self.primary).chain(self.companion.as_ref())
    }
}

/// What happened to one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitDisposition {
    /// A required primary snapshot was absent.
    Skipped(SkippedUnit),
    /// The unit was merged and classified.
    Processed {
        /// Final texts and per-artifact outcomes.
        texts: UnitTexts,
        /// The companion was dropped because its snapshots were incomplete.
        companion_skip: Option<SkippedUnit>,
    },
}

/// Merge and classify a single unit.
#[must_use]
pub fn reconcile_unit(unit: &Unit, options: &ReconcileOptions) -> UnitDisposition {
    let Some(primary) = reconcile_artifact(&unit.name, &unit.snapshots, options) else {
        return UnitDisposition::Skipped(SkippedUnit {
            name: unit.name.clone(),
            missing: unit.snapshots.missing_roles(),
        });
    };

    let (companion, companion_skip) = match &unit.companion {
        None => (None, None),
        Some(c) => match reconcile_artifact(&c.name, &c.snapshots, options) {
            Some(text) => (Some(text), None),
            None => (
                None,
                Some(SkippedUnit {
                    name: c.name.clone(),
                    missing: c.snapshots.missing_roles(),
                }),
            ),
        },
    };

    UnitDisposition::Processed {
        texts: UnitTexts { primary, companion },
        companion_skip,
    }
}

fn reconcile_artifact(
    name: &UnitName,
    snapshots: &SnapshotSet,
    options: &ReconcileOptions,
) -> Option<ArtifactText> {
    let s = snapshots.complete()?;
    let merged = merge_with(s.target, s.before, s.after, &options.merge);
    let classified = classify(s.target, merged, options.whitespace);
    Some(ArtifactText {
        name: name.clone(),
        outcome: classified.outcome,
        text: classified.final_text,
        hunks: classified.hunks,
    })
}

// ---------------------------------------------------------------------------
// ReconciliationResult
// ---------------------------------------------------------------------------

/// Aggregate classification of a run.
///
/// Every processed unit appears in exactly one of `clean`, `no_real_change`
/// and `conflicted`, in input order. Skipped units appear in none of them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Conflict-free units with a meaningful change.
    pub clean: Vec<UnitName>,
    /// Conflict-free units whitespace-equivalent to the target.
    pub no_real_change: Vec<UnitName>,
    /// Units with at least one conflict block.
    pub conflicted: Vec<UnitName>,
    /// Units excluded because a primary snapshot was absent.
    pub skipped: Vec<SkippedUnit>,
    /// Companions excluded because one of their snapshots was absent.
    pub skipped_companions: Vec<SkippedUnit>,
}

impl ReconciliationResult {
    /// Returns `true` if any unit was classified `Conflict`.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicted.is_empty()
    }

    /// Number of units that were merged and classified.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.clean.len() + self.no_real_change.len() + self.conflicted.len()
    }

    /// The bucket a unit landed in, if it was processed.
    #[must_use]
    pub fn outcome_of(&self, name: &UnitName) -> Option<Outcome> {
        if self.clean.contains(name) {
            Some(Outcome::Clean)
        } else if self.no_real_change.contains(name) {
            Some(Outcome::NoRealChange)
        } else if self.conflicted.contains(name) {
            Some(Outcome::Conflict)
        } else {
            None
        }
    }
}

/// Output of [`run_all`]: the aggregate plus the `unit → final text` table
/// for every non-skipped unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Bucketed outcomes.
    pub result: ReconciliationResult,
    /// Final texts keyed by unit name.
    pub final_texts: BTreeMap<UnitName, UnitTexts>,
}

/// Owned accumulator for one run.
#[derive(Debug, Default)]
pub struct ResultBuilder {
    inner: Reconciliation,
}

impl ResultBuilder {
    /// Start an empty run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one unit's disposition.
    pub fn record(&mut self, name: &UnitName, disposition: UnitDisposition) {
        let result = &mut self.inner.result;
        match disposition {
            UnitDisposition::Skipped(skip) => {
                warn!(unit = %skip.name, missing = ?skip.missing, "skipping unit");
                result.skipped.push(skip);
            }
            UnitDisposition::Processed {
                texts,
                companion_skip,
            } => {
                if let Some(skip) = companion_skip {
                    warn!(unit = %name, companion = %skip.name, missing = ?skip.missing, "dropping companion");
                    result.skipped_companions.push(skip);
                }
                let outcome = texts.outcome();
                match outcome {
                    Outcome::Clean => result.clean.push(name.clone()),
                    Outcome::NoRealChange => result.no_real_change.push(name.clone()),
                    Outcome::Conflict => {
                        warn!(unit = %name, conflicts = texts.conflict_count(), "unit has conflicts");
                        result.conflicted.push(name.clone());
                    }
                }
                debug!(unit = %name, %outcome, "unit classified");
                self.inner.final_texts.insert(name.clone(), texts);
            }
        }
    }

    /// Finish the run.
    ///
    /// # Errors
    /// Returns [`BatchError::AllSkipped`] if nothing was processed.
    pub fn finish(self) -> Result<Reconciliation, BatchError> {
        if self.inner.result.processed_count() == 0 {
            return Err(BatchError::AllSkipped {
                skipped: self.inner.result.skipped,
            });
        }
        let result = &self.inner.result;
        info!(
            clean = result.clean.len(),
            no_real_change = result.no_real_change.len(),
            conflicted = result.conflicted.len(),
            skipped = result.skipped.len(),
            "reconciliation finished"
        );
        Ok(self.inner)
    }
}

// ---------------------------------------------------------------------------
// run_all
// ---------------------------------------------------------------------------

/// Precondition failures of a batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// The batch contained no units.
    #[error("no units to reconcile")]
    NoUnits,

    /// Two units share a name.
    #[error("duplicate unit `{name}`")]
    DuplicateUnit {
        /// The repeated name.
        name: UnitName,
    },

    /// Every unit was skipped for missing snapshots.
    #[error("all {} unit(s) were skipped for missing snapshots", .skipped.len())]
    AllSkipped {
        /// The skipped units.
        skipped: Vec<SkippedUnit>,
    },
}

/// Reconcile every unit, in the order given.
///
/// # Errors
/// Returns a [`BatchError`] for an empty batch, duplicate unit names, or a
/// batch in which every unit was skipped.
pub fn run_all(units: &[Unit], options: &ReconcileOptions) -> Result<Reconciliation, BatchError> {
    let span = info_span!("run_all", units = units.len());
    let _guard = span.enter();

    if units.is_empty() {
        return Err(BatchError::NoUnits);
    }

    let mut seen = BTreeSet::new();
    for unit in units {
        if !seen.insert(&unit.name) {
            return Err(BatchError::DuplicateUnit {
                name: unit.name.clone(),
            });
        }
    }

    let mut builder = ResultBuilder::new();
    for unit in units {
        builder.record(&unit.name, reconcile_unit(unit, options));
    }
    builder.finish()
}
