//! Core reconciliation engine for deltamerge.
//!
//! Reconciles a delta (a `before → after` change per unit) with the current,
//! independently evolved state of a deployment target. The pipeline:
//!
//! ```text
//! Unit ──► merge (diff3) ──► classify ──► ResultBuilder ──► decide
//!  │         target/before/after   Clean | NoRealChange | Conflict   proceed?
//!  └── absent snapshot ──► skipped
//! ```
//!
//! - [`unit`]: snapshot sets (before/after/target, optional companion).
//! - [`merge`]: pure three-way line merge producing text and conflict hunks.
//! - [`classify`]: outcome tagging with whitespace-insensitive equivalence.
//! - [`batch`]: per-run accumulation into disjoint outcome buckets.
//! - [`gate`]: go/no-go publication decision and terminal exit status.
//!
//! Nothing in this crate performs I/O; snapshots arrive line-feed normalized
//! from the caller.

pub mod batch;
pub mod classify;
pub mod gate;
pub mod merge;
pub mod unit;

pub use batch::{
    ArtifactText, BatchError, Reconciliation, ReconcileOptions, ReconciliationResult,
    SkippedUnit, UnitTexts, run_all,
};
pub use classify::{Outcome, WhitespaceRule};
pub use gate::{GateReason, PublishDecision, PublishMode, RunStatus, decide};
pub use merge::{ConflictHunk, ConflictStyle, MarkerLabels, MergeOptions, MergeResult, merge};
pub use unit::{SnapshotRole, SnapshotSet, Unit, UnitName};
