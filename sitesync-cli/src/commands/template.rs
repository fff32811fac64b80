//! `sitesync template sync|diff`

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use sitesync_core::{history, HistoryEntry};
use sitesync_sync::{pipeline, BranchStatus, FileAction, FileOutcome, ProposalStatus, SyncReport};

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Stage the latest template release on a branch and open a pull request.
    Sync(SyncArgs),

    /// Show unified diffs between tracked files and the template.
    Diff,
}

/// Arguments for `sitesync template sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Report what would change without creating branches, commits or pull requests.
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::Sync(args) => sync(args).await,
        TemplateCommand::Diff => diff().await,
    }
}

async fn sync(args: SyncArgs) -> Result<()> {
    let home = super::home()?;
    let config = super::load_config(&home)?;
    let (fork, template) = super::connect(&config)?;

    let report = match pipeline::template_sync(&fork, &template, &config, args.dry_run).await {
        Ok(report) => report,
        Err(err) if err.is_auth() => {
            return Err(anyhow::Error::new(err).context(format!(
                "template sync was refused; check that ${} grants write access to '{}'",
                config.token_env, config.repository
            )))
        }
        Err(err) => return Err(anyhow::Error::new(err).context("template sync failed")),
    };

    print_report(&report);

    if let Some(url) = report.proposal.as_deref() {
        let entry = HistoryEntry {
            version: report.release.version.clone(),
            branch: report.branch.name.clone(),
            url: url.to_string(),
            opened_at: Utc::now(),
        };
        history::record_at(&home, &config.repository, entry)
            .context("pull request opened but could not be recorded in history")?;
    }
    Ok(())
}

async fn diff() -> Result<()> {
    let home = super::home()?;
    let config = super::load_config(&home)?;
    let (fork, template) = super::connect(&config)?;

    let diffs = pipeline::template_diff(&fork, &template, &config)
        .await
        .context("template diff failed")?;
    if diffs.is_empty() {
        println!("Tracked files match '{}'.", config.template);
        return Ok(());
    }

    for diff in diffs {
        print!("{}", diff.unified_diff);
        if !diff.unified_diff.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "file")]
    path: String,
    #[tabled(rename = "kind")]
    kind: &'static str,
    #[tabled(rename = "result")]
    action: String,
}

fn print_report(report: &SyncReport) {
    let branch_state = match report.branch_status {
        BranchStatus::Created => "created",
        BranchStatus::AlreadyExists => "existing",
        BranchStatus::WouldCreate => "would create",
    };
    println!(
        "Template release {} | branch {} ({})",
        report.release.version.bold(),
        report.branch.name,
        branch_state,
    );

    let row = |kind: &'static str, outcome: &FileOutcome| FileRow {
        path: outcome.path.clone(),
        kind,
        action: action_label(outcome.action),
    };
    let rows: Vec<FileRow> = report
        .deprecated
        .iter()
        .map(|o| row("deprecated", o))
        .chain(std::iter::once(row("customization", &report.customization)))
        .chain(report.tracked.iter().map(|o| row("tracked", o)))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    match (report.proposal_status, report.proposal.as_deref()) {
        (ProposalStatus::Opened, Some(url)) => println!("✓ Opened pull request: {url}"),
        (ProposalStatus::AlreadyOpen, _) => println!(
            "{} file(s) written to '{}'; its pull request is already open.",
            report.writes(),
            report.branch.name
        ),
        (ProposalStatus::Skipped, _) => println!(
            "Dry run: {} change(s) would be written to '{}'.",
            report.pending(),
            report.branch.name
        ),
        _ => println!("{}", "Already up to date with the template.".green()),
    }
}

fn action_label(action: FileAction) -> String {
    match action {
        FileAction::Created => "created".green().to_string(),
        FileAction::Updated => "updated".green().to_string(),
        FileAction::Deleted => "deleted".red().to_string(),
        FileAction::Unchanged => "unchanged".to_string(),
        FileAction::Absent => "absent".bright_black().to_string(),
        FileAction::Preserved => "preserved".to_string(),
        FileAction::MissingUpstream => "missing upstream".yellow().to_string(),
        FileAction::WouldCreate => "would create".cyan().to_string(),
        FileAction::WouldUpdate => "would update".cyan().to_string(),
        FileAction::WouldDelete => "would delete".cyan().to_string(),
    }
}
