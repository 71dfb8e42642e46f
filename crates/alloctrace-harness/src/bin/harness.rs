//! CLI entrypoint for the alloctrace audit harness.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use alloctrace_harness::audit_log::{ArtifactRecord, validate_log_file};
use alloctrace_harness::replay::replay_file;
use alloctrace_harness::report::LeakReport;

/// Audit tooling for alloctrace JSONL logs.
#[derive(Debug, Parser)]
#[command(name = "alloctrace-harness")]
#[command(about = "Validate and summarize alloctrace audit logs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a JSONL audit log against the schema.
    Validate {
        /// Audit log path.
        #[arg(long)]
        log: PathBuf,
        /// Optional output path for the artifact integrity record (JSON).
        #[arg(long)]
        artifact_record: Option<PathBuf>,
    },
    /// Replay a JSONL audit log and print the leak verdict.
    Summary {
        /// Audit log path.
        #[arg(long)]
        log: PathBuf,
        /// Output report path (markdown). Prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Validate {
            log,
            artifact_record,
        } => {
            let entries = validate_log_file(&log)?;
            println!("{}: {} entries, schema ok", log.display(), entries.len());
            if let Some(path) = artifact_record {
                let record = ArtifactRecord::for_file(&log)?;
                std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;
                println!("artifact record written to {}", path.display());
            }
            Ok(true)
        }
        Command::Summary { log, output } => {
            let summary = replay_file(&log)?;
            let leaks = summary
                .live
                .iter()
                .map(|(&addr, &size)| alloctrace_core::PointerRecord::new(addr, size))
                .collect();
            let report = LeakReport::from_parts(summary.stats, leaks);
            let rendered = report.render();
            match output {
                Some(path) => std::fs::write(&path, rendered)?,
                None => print!("{rendered}"),
            }
            Ok(report.verdict() == alloctrace_harness::report::Verdict::Pass)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("alloctrace-harness: {err}");
            ExitCode::FAILURE
        }
    }
}
