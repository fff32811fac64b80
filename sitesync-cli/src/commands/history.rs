//! `sitesync history`: pull requests opened by `template sync`.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use sitesync_core::history;

/// Arguments for `sitesync history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "opened")]
    opened: String,
    #[tabled(rename = "pull request")]
    url: String,
}

impl HistoryArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        let recorded = history::load_at(&home, &config.repository)
            .with_context(|| format!("failed to load history for '{}'", config.repository))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&recorded)
                    .context("failed to serialize history JSON")?
            );
            return Ok(());
        }

        if recorded.entries.is_empty() {
            println!("No pull requests recorded for '{}'.", config.repository);
            return Ok(());
        }

        let rows: Vec<HistoryRow> = recorded
            .entries
            .into_iter()
            .map(|entry| HistoryRow {
                version: entry.version,
                opened: entry.opened_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                url: entry.url,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
