//! Run reports for humans (text) and machines (JSON).

use std::fmt::Write as _;

use clap::ValueEnum;
use deltamerge_core::{
    ArtifactText, ConflictHunk, Outcome, PublishDecision, PublishMode, ReconciliationResult,
    RunStatus, UnitName,
};
use serde::Serialize;

use crate::publish::PublishReport;
use crate::reconcile::RunOutput;
use crate::stage::Manifest;

/// Output format of the run report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Grouped, human-readable summary.
    #[default]
    Text,
    /// A single JSON document.
    Json,
}

/// Render a run in the requested format.
///
/// # Errors
/// Returns an error only if JSON serialization fails.
pub fn render(out: &RunOutput, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(render_text(out)),
        ReportFormat::Json => render_json(out),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonReport<'a> {
    source: &'a str,
    mode: PublishMode,
    status: RunStatus,
    exit_code: u8,
    result: &'a ReconciliationResult,
    units: Vec<JsonUnit<'a>>,
    decision: &'a PublishDecision,
    staged: Option<&'a Manifest>,
    published: Option<&'a PublishReport>,
}

#[derive(Serialize)]
struct JsonUnit<'a> {
    name: &'a UnitName,
    outcome: Outcome,
    conflicts: usize,
    artifacts: Vec<&'a ArtifactText>,
}

/// Render a run as pretty-printed JSON.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn render_json(out: &RunOutput) -> Result<String, serde_json::Error> {
    let units = out
        .reconciliation
        .final_texts
        .iter()
        .map(|(name, texts)| JsonUnit {
            name,
            outcome: texts.outcome(),
            conflicts: texts.conflict_count(),
            artifacts: texts.artifacts().collect(),
        })
        .collect();
    let report = JsonReport {
        source: &out.source,
        mode: out.mode,
        status: out.status,
        exit_code: out.status.exit_code(),
        result: &out.reconciliation.result,
        units,
        decision: &out.decision,
        staged: out.staged.as_ref(),
        published: out.published.as_ref(),
    };
    serde_json::to_string_pretty(&report)
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Render a run as a grouped text summary.
#[must_use]
pub fn render_text(out: &RunOutput) -> String {
    let result = &out.reconciliation.result;
    let mut s = String::new();

    let _ = writeln!(s, "reconcile ({}): {}", out.mode, out.source);
    let _ = writeln!(
        s,
        "  {} clean, {} no real change, {} conflict, {} skipped",
        result.clean.len(),
        result.no_real_change.len(),
        result.conflicted.len(),
        result.skipped.len()
    );

    section(&mut s, "Clean", &result.clean, |_, _| {});
    section(&mut s, "No real change", &result.no_real_change, |_, _| {});
    section(&mut s, "Conflict", &result.conflicted, |s, name| {
        if let Some(texts) = out.reconciliation.final_texts.get(name) {
            for artifact in texts.artifacts().filter(|a| !a.hunks.is_empty()) {
                let _ = writeln!(s, "    {} ({} conflict(s))", artifact.name, artifact.hunks.len());
                for hunk in &artifact.hunks {
                    let _ = writeln!(s, "      {}", describe_hunk(hunk));
                }
            }
        }
    });

    if !result.skipped.is_empty() {
        let _ = writeln!(s, "\nSkipped:");
        for skip in &result.skipped {
            let _ = writeln!(s, "  {skip}");
        }
    }
    if !result.skipped_companions.is_empty() {
        let _ = writeln!(s, "\nSkipped companions:");
        for skip in &result.skipped_companions {
            let _ = writeln!(s, "  {skip}");
        }
    }

    let _ = writeln!(s);
    if let Some(manifest) = &out.staged {
        let _ = writeln!(
            s,
            "Staged {} file(s) for {} unit(s).",
            manifest.files.len(),
            manifest.unit_count()
        );
    }
    match &out.published {
        Some(report) => {
            let _ = writeln!(
                s,
                "Published {} file(s) to {}.",
                report.written.len(),
                report.destination
            );
        }
        None => {
            let _ = writeln!(s, "Not published: {}.", out.decision.reason);
        }
    }
    s
}

fn section(s: &mut String, title: &str, names: &[UnitName], mut detail: impl FnMut(&mut String, &UnitName)) {
    if names.is_empty() {
        return;
    }
    let _ = writeln!(s, "\n{title}:");
    for name in names {
        let _ = writeln!(s, "  {name}");
        detail(s, name);
    }
}

/// One-line description of a conflict block.
#[must_use]
pub fn describe_hunk(hunk: &ConflictHunk) -> String {
    let place = match hunk.before_len {
        0 => format!("insertion before line {}", hunk.before_start),
        1 => format!("before line {}", hunk.before_start),
        n => format!("before lines {}-{}", hunk.before_start, hunk.before_start + n - 1),
    };
    format!(
        "{place}: target {} line(s), delta {} line(s), at merged line {}",
        hunk.target_len, hunk.delta_len, hunk.output_line
    )
}
