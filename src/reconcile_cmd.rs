//! `deltamerge reconcile`: run the full pipeline against a target.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use deltamerge::config::DeltamergeConfig;
use deltamerge::core::{BatchError, ConflictStyle, PublishMode, RunStatus};
use deltamerge::publish::DirectoryPublisher;
use deltamerge::reconcile::{RunSettings, execute};
use deltamerge::report::{ReportFormat, render};
use deltamerge::source::{DirectorySource, GitDeltaSource, SnapshotSource, UnitLayout};
use deltamerge::ReconcileError;

/// Reconcile a delta with the current target and optionally publish
///
/// The delta is either a pair of directory trees (--before/--after) or a
/// git commit (--git-rev), compared against its first parent. Every file
/// the delta touches is merged three-way with the target's copy.
///
/// Modes:
///   preview   stage clean units, publish nothing (default)
///   publish   stage and publish clean units, only if nothing conflicts
///   dry-run   report only, write nothing
///
/// Exit codes: 0 success, 1 conflicts present, 2 precondition failure.
///
/// Examples:
///   deltamerge reconcile --before v1/ --after v2/ --target org/
///   deltamerge reconcile --git-rev HEAD --target org/ --mode publish
///   deltamerge reconcile --git-rev release-42 --repo ../app --target org/ --format json
#[derive(Args, Debug)]
#[command(verbatim_doc_comment)]
pub struct ReconcileArgs {
    /// Tree holding the delta's starting point
    #[arg(long, requires = "after", conflicts_with = "git_rev")]
    pub before: Option<PathBuf>,

    /// Tree holding the delta's end point
    #[arg(long, requires = "before", conflicts_with = "git_rev")]
    pub after: Option<PathBuf>,

    /// Commit whose change (against its first parent) is the delta
    #[arg(long, required_unless_present = "before")]
    pub git_rev: Option<String>,

    /// Repository to read --git-rev from
    #[arg(long, default_value = ".", requires = "git_rev")]
    pub repo: PathBuf,

    /// Current state of the deployment target
    #[arg(long)]
    pub target: PathBuf,

    /// Staging directory [default: from config]
    #[arg(long)]
    pub staging: Option<PathBuf>,

    /// What to do with clean units [default: from config]
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Only reconcile paths matching this glob (repeatable) [default: from config]
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Conflict block layout [default: from config]
    #[arg(long, value_enum)]
    pub conflict_style: Option<StyleArg>,
}

/// Publish mode as spelled on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Preview,
    Publish,
    DryRun,
}

impl From<ModeArg> for PublishMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Preview => Self::Preview,
            ModeArg::Publish => Self::Publish,
            ModeArg::DryRun => Self::DryRun,
        }
    }
}

/// Conflict style as spelled on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StyleArg {
    Merge,
    Diff3,
}

impl From<StyleArg> for ConflictStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Merge => Self::Merge,
            StyleArg::Diff3 => Self::Diff3,
        }
    }
}

pub fn run(args: &ReconcileArgs, config: &DeltamergeConfig) -> Result<RunStatus> {
    let mut layout_config = config.layout.clone();
    if !args.include.is_empty() {
        layout_config.include.clone_from(&args.include);
    }
    let layout = UnitLayout::from_config(&layout_config)?;

    let source: Box<dyn SnapshotSource> = match (&args.before, &args.after, &args.git_rev) {
        (Some(before), Some(after), _) => Box::new(DirectorySource::new(
            before.clone(),
            after.clone(),
            args.target.clone(),
            layout,
        )),
        (_, _, Some(rev)) => Box::new(GitDeltaSource::new(
            args.repo.clone(),
            rev.as_str(),
            args.target.clone(),
            layout,
        )),
        _ => anyhow::bail!("pass either --before and --after, or --git-rev"),
    };

    let settings = RunSettings {
        options: config
            .merge
            .reconcile_options(args.conflict_style.map(ConflictStyle::from)),
        mode: args.mode.map_or(config.publish.mode, PublishMode::from),
        staging: args
            .staging
            .clone()
            .unwrap_or_else(|| layout_config.staging.clone()),
    };
    let publisher = DirectoryPublisher::new(args.target.clone());

    let output = match execute(source.as_ref(), &publisher, &settings) {
        Ok(output) => output,
        Err(ReconcileError::Batch(BatchError::AllSkipped { skipped })) => {
            eprintln!("error: every unit was skipped for missing snapshots:");
            for skip in &skipped {
                eprintln!("  {skip}");
            }
            eprintln!("  To fix: check that --target points at the deployed tree");
            return Ok(RunStatus::PreconditionFailure);
        }
        Err(e) => return Err(e.into()),
    };

    let rendered = render(&output, args.format).context("failed to render report")?;
    print!("{rendered}");
    if args.format == ReportFormat::Json {
        println!();
    }
    Ok(output.status)
}
