//! `sitesync status`: which notes are published, changed, new or removed.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use sitesync_core::Config;
use sitesync_sync::{pipeline, PublishPartition, PublishStatus};

/// Arguments for `sitesync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also list notes that are already published.
    #[arg(long)]
    pub all: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub async fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        let (fork, _) = super::connect(&config)?;

        let partition = pipeline::publish_status(&fork, &config)
            .await
            .with_context(|| format!("status check failed for '{}'", config.repository))?;

        if self.json {
            print_json(&config, &partition)?;
            return Ok(());
        }
        print_table(&config, &partition, self.all);
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    repository: String,
    summary: SummaryJson,
    #[serde(flatten)]
    partition: &'a PublishPartition,
}

#[derive(Serialize)]
struct SummaryJson {
    published: usize,
    changed: usize,
    unpublished: usize,
    deleted: usize,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "note")]
    path: String,
    #[tabled(rename = "status")]
    status: String,
}

fn print_json(config: &Config, partition: &PublishPartition) -> Result<()> {
    let payload = StatusJson {
        repository: config.repository.to_string(),
        summary: SummaryJson {
            published: partition.published.len(),
            changed: partition.changed.len(),
            unpublished: partition.unpublished.len(),
            deleted: partition.deleted.len(),
        },
        partition,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(config: &Config, partition: &PublishPartition, all: bool) {
    println!(
        "sitesync v{} | {} | {} published | {} changed | {} unpublished | {} deleted",
        env!("CARGO_PKG_VERSION"),
        config.repository,
        partition.published.len(),
        partition.changed.len(),
        partition.unpublished.len(),
        partition.deleted.len(),
    );

    if partition.is_empty() {
        println!("No notes found locally or in '{}'.", config.content_dir);
        return;
    }

    let rows: Vec<StatusRow> = partition
        .entries()
        .filter(|(_, status)| all || *status != PublishStatus::Published)
        .map(|(path, status)| StatusRow {
            path: path.to_string(),
            status: status_label(status),
        })
        .collect();
    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    if partition.has_pending() {
        println!("Publish changed and unpublished notes, and remove deleted ones, to bring the site up to date.");
    } else {
        println!("{}", "Everything is published.".green());
    }
}

fn status_label(status: PublishStatus) -> String {
    match status {
        PublishStatus::Published => "published".green().to_string(),
        PublishStatus::Changed => "changed".yellow().bold().to_string(),
        PublishStatus::Unpublished => "unpublished".cyan().to_string(),
        PublishStatus::Deleted => "deleted".red().to_string(),
    }
}
