//! Retainer: keep the newest N backups in a folder, then run the backup tool.
//!
//! Thin binary entry point. All logic lives in the `retainer-core` crate.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use retainer_core::backup::BackupCommand;
use retainer_core::report::RunReport;
use retainer_core::retention::RetentionPolicy;
use retainer_core::runner::{self, Layout, RunOptions};
use tracing::{error, Level};

/// Delete the oldest files in a backup folder until at most
/// MAX_BACKUP_FILES remain, then run the backup tool.
#[derive(Parser, Debug)]
#[command(name = "retainer", version)]
struct Cli {
    /// Folder holding the backups. Names must sort oldest-first.
    backup_dir: PathBuf,

    /// Maximum number of backups to keep. Zero or negative keeps none.
    #[arg(allow_negative_numbers = true)]
    max_backup_files: i64,

    /// Backup program and arguments [default: java -jar sesame-backup.jar]
    #[arg(last = true, value_name = "BACKUP_CMD")]
    backup_cmd: Vec<String>,

    /// Show what would be removed; delete nothing and skip the backup.
    #[arg(long)]
    dry_run: bool,

    /// Keep one backup fewer, leaving room for the one about to be written.
    #[arg(long)]
    reserve_slot: bool,

    /// Skip the backup step.
    #[arg(long)]
    no_backup: bool,

    /// Apply the limit to each repository folder under BACKUP_DIR instead
    /// of to BACKUP_DIR itself.
    #[arg(long)]
    per_repo: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.max_backup_files).with_reserve_slot(self.reserve_slot)
    }

    fn backup_command(&self) -> BackupCommand {
        BackupCommand::from_argv(&self.backup_cmd).unwrap_or_default()
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            backup_dir: self.backup_dir.clone(),
            policy: self.policy(),
            layout: if self.per_repo {
                Layout::PerRepository
            } else {
                Layout::Flat
            },
            dry_run: self.dry_run,
            backup: (!self.no_backup).then(|| self.backup_command()),
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Missing positionals print usage and exit 0. Bad values still fail.
        Err(e) if e.kind() == ErrorKind::MissingRequiredArgument => {
            e.print().context("failed to print usage")?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => e.exit(),
    };

    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    let report = runner::run(&cli.options());
    println!("{}", render(&report, cli.json));

    Ok(ExitCode::from(report.status().exit_code()))
}

/// Stdout text for a finished run. A report that cannot be serialised falls
/// back to the summary, so the exit code always reflects the run itself.
fn render(report: &RunReport, json: bool) -> String {
    if json {
        match report.to_json() {
            Ok(text) => return text,
            Err(e) => error!("Could not serialise run report, printing summary instead: {e}"),
        }
    }
    report.summary_lines().join("\n")
}
