use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use deltamerge::config::{DEFAULT_CONFIG_FILE, DeltamergeConfig};
use deltamerge::core::RunStatus;
use deltamerge::telemetry;

mod merge_file_cmd;
mod reconcile_cmd;

/// Reconcile a committed delta with an independently edited deployment target
///
/// A delta is the change between two versions of a set of files (BEFORE and
/// AFTER). The target is what is currently deployed, which may have drifted
/// through hotfixes or manual edits. deltamerge applies the delta to the
/// target with a three-way merge per file and sorts every file into:
///
///   clean            the delta applies; publishing changes the target
///   no real change   the result equals the target up to whitespace
///   conflict         the delta and the target edited the same lines
///
/// Nothing is published while any file is in conflict.
///
/// QUICK START:
///
///   deltamerge reconcile --before v1/ --after v2/ --target org/
///   deltamerge reconcile --git-rev HEAD --target org/ --mode publish
#[derive(Parser)]
#[command(name = "deltamerge")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'deltamerge <command> --help' for more information on a specific command.")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "DELTAMERGE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Reconcile(reconcile_cmd::ReconcileArgs),

    MergeFile(merge_file_cmd::MergeFileArgs),

    /// Print shell completions
    ///
    /// Examples:
    ///   deltamerge completions bash > ~/.local/share/bash-completion/completions/deltamerge
    ///   deltamerge completions zsh > ~/.zfunc/_deltamerge
    #[command(verbatim_doc_comment)]
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match DeltamergeConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(RunStatus::PreconditionFailure.exit_code());
        }
    };
    let _telemetry = telemetry::init(&config.log);

    let status = match &cli.command {
        Commands::Reconcile(args) => reconcile_cmd::run(args, &config),
        Commands::MergeFile(args) => merge_file_cmd::run(args, &config),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "deltamerge", &mut std::io::stdout());
            Ok(RunStatus::Success)
        }
    };

    match status {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(RunStatus::PreconditionFailure.exit_code())
        }
    }
}
