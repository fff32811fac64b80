//! sitesync: keep a published notes site in step with local content and
//! with the template it was forked from.
//!
//! # Usage
//!
//! ```text
//! sitesync init --repo <owner/name> --template <owner/name> --local <dir> [--force]
//! sitesync status [--all] [--json]
//! sitesync template sync [--dry-run]
//! sitesync template diff
//! sitesync history [--json]
//! ```

mod commands;

use std::future::Future;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    history::HistoryArgs, init::InitArgs, status::StatusArgs, template::TemplateCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "sitesync",
    version,
    about = "Publish-status diffing and template updates for a notes site repository",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). Overrides RUST_LOG.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write ~/.sitesync/config.yaml for a repository and its template.
    Init(InitArgs),

    /// Compare local content with what the repository currently publishes.
    Status(StatusArgs),

    /// Bring template files up to the template's latest release.
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },

    /// List pull requests opened by `template sync`.
    History(HistoryArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Status(args) => block_on(args.run()),
        Commands::Template { command } => block_on(commands::template::run(command)),
        Commands::History(args) => args.run(),
    }
}

fn block_on(task: impl Future<Output = Result<()>>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(task)
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
