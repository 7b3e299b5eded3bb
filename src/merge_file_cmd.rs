//! `deltamerge merge-file`: merge three files and print the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use deltamerge::config::DeltamergeConfig;
use deltamerge::core::classify::classify;
use deltamerge::core::merge::merge_with;
use deltamerge::core::{ConflictStyle, Outcome, RunStatus};
use deltamerge::normalize::normalize;
use tracing::info;

use crate::reconcile_cmd::StyleArg;

/// Three-way merge of a single file
///
/// Applies the change BEFORE → AFTER to TARGET and prints the merged text
/// to stdout. Conflicting regions are wrapped in conflict markers.
///
/// Exit codes: 0 merged cleanly, 1 conflicts, 2 unreadable input.
///
/// Examples:
///   deltamerge merge-file org/Foo.cls v1/Foo.cls v2/Foo.cls
///   deltamerge merge-file --conflict-style diff3 ours base theirs > merged
#[derive(Args, Debug)]
#[command(verbatim_doc_comment)]
pub struct MergeFileArgs {
    /// Current target version
    pub target: PathBuf,

    /// Delta starting point
    pub before: PathBuf,

    /// Delta end point
    pub after: PathBuf,

    /// Conflict block layout [default: from config]
    #[arg(long, value_enum)]
    pub conflict_style: Option<StyleArg>,
}

fn read(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
    Ok(normalize(&bytes, path)?)
}

pub fn run(args: &MergeFileArgs, config: &DeltamergeConfig) -> Result<RunStatus> {
    let target = read(&args.target)?;
    let before = read(&args.before)?;
    let after = read(&args.after)?;

    let options = config
        .merge
        .reconcile_options(args.conflict_style.map(ConflictStyle::from));
    let merged = merge_with(&target, &before, &after, &options.merge);
    let classified = classify(&target, merged, options.whitespace);
    info!(
        outcome = %classified.outcome,
        conflicts = classified.conflict_count(),
        "merged {}",
        args.target.display()
    );

    print!("{}", classified.final_text);
    Ok(if classified.outcome == Outcome::Conflict {
        RunStatus::ConflictsPresent
    } else {
        RunStatus::Success
    })
}
