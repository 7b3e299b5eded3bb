//! The reconcile pipeline: source → batch → gate → stage → publish.
//!
//! [`execute`] owns one run end to end and returns everything a report
//! needs. Staging happens whenever the gate lists units (preview or a
//! proceeding publish) and never in dry-run. The publisher is called only
//! when the gate proceeds.

use std::path::PathBuf;

use deltamerge_core::{
    PublishDecision, PublishMode, Reconciliation, ReconcileOptions, RunStatus, decide, run_all,
};
use tracing::{info, info_span, warn};

use crate::error::ReconcileError;
use crate::publish::{PublishReport, Publisher};
use crate::source::SnapshotSource;
use crate::stage::{Manifest, stage};

/// Settings for one run.
#[derive(Clone, Debug)]
pub struct RunSettings {
    /// Engine options.
    pub options: ReconcileOptions,
    /// Requested publish mode.
    pub mode: PublishMode,
    /// Staging directory.
    pub staging: PathBuf,
}

/// Everything produced by one run.
#[derive(Clone, Debug)]
pub struct RunOutput {
    /// Description of where the snapshots came from.
    pub source: String,
    /// Mode the run used.
    pub mode: PublishMode,
    /// Per-unit outcomes and final texts.
    pub reconciliation: Reconciliation,
    /// The gate's decision.
    pub decision: PublishDecision,
    /// Terminal status.
    pub status: RunStatus,
    /// The staging manifest, if anything was staged.
    pub staged: Option<Manifest>,
    /// What was published, if the gate proceeded.
    pub published: Option<PublishReport>,
}

/// Run the full pipeline.
///
/// # Errors
/// Returns an error for precondition failures (unreadable input, empty or
/// fully skipped batch) and for staging or publication failures.
pub fn execute(
    source: &dyn SnapshotSource,
    publisher: &dyn Publisher,
    settings: &RunSettings,
) -> Result<RunOutput, ReconcileError> {
    let description = source.describe();
    let span = info_span!("reconcile", mode = %settings.mode, source = %description);
    let _guard = span.enter();

    let units = source.load_units()?;
    info!(units = units.len(), "loaded snapshots");

    let reconciliation = run_all(&units, &settings.options)?;
    let decision = decide(&reconciliation.result, settings.mode);
    info!(proceed = decision.proceed, reason = %decision.reason, "publish gate");

    let staged = if settings.mode == PublishMode::DryRun || decision.units_to_publish.is_empty() {
        None
    } else {
        Some(stage(&settings.staging, &reconciliation, &decision.units_to_publish)?)
    };

    let published = match (&staged, decision.proceed) {
        (Some(manifest), true) => Some(publisher.publish(&settings.staging, manifest)?),
        (None, true) => {
            warn!("gate proceeded with nothing staged");
            None
        }
        (_, false) => None,
    };

    Ok(RunOutput {
        source: description,
        mode: settings.mode,
        status: RunStatus::from_result(&reconciliation.result),
        reconciliation,
        decision,
        staged,
        published,
    })
}
