use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use crate::commands::{self, CommandReport};
use crate::logging;

#[derive(Parser, Debug)]
#[command(
    name = "rollcall",
    about = "Ingest playbook-run and release-lifecycle reports into an append-only SQLite history",
    version
)]
struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile existing files, then ingest new ones as they appear
    Watch {
        /// Run the startup reconcile only and exit
        #[arg(long)]
        once: bool,
    },
    /// Ingest specific files through the same ledger-gated pipeline
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show release snapshots, or one binary's history
    Releases {
        #[arg(long)]
        binary: Option<String>,
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },
    /// Show latest playbook runs, or one playbook's history
    Playbooks {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },
    /// Resolved paths, config and store row counts
    Status,
    /// Inspect the daemon lock
    Health,
    /// Stop the running watch daemon
    Stop,
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{}: {}", report.command, if report.ok { "ok" } else { "failed" });
    for line in &report.details {
        println!("  {line}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.command {
        Command::Watch { .. } | Command::Ingest { .. } => Level::INFO,
        _ => Level::WARN,
    };
    logging::init(level);

    let report = match &cli.command {
        Command::Watch { once } => commands::watch::run(&commands::watch::WatchOptions { once: *once })?,
        Command::Ingest { files } => commands::ingest::run(files)?,
        Command::Releases { binary, limit } => commands::releases::run(binary.as_deref(), *limit)?,
        Command::Playbooks { name, limit } => commands::playbooks::run(name.as_deref(), *limit)?,
        Command::Status => commands::status::run()?,
        Command::Health => commands::health::run()?,
        Command::Stop => commands::stop::run()?,
    };

    render(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
