//! `sitesync init --repo <owner/name> --template <owner/name> --local <dir>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use sitesync_core::{config, Config, RepoSlug};

/// Write the sitesync config.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Repository that publishes the site, as owner/name.
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: RepoSlug,

    /// Template repository it was forked from, as owner/name.
    #[arg(long, value_name = "OWNER/NAME")]
    pub template: RepoSlug,

    /// Local folder holding the notes to publish.
    #[arg(long, value_name = "DIR")]
    pub local: PathBuf,

    /// Folder in the repository that mirrors the local notes.
    #[arg(long, value_name = "PATH")]
    pub content_dir: Option<String>,

    /// Default branch of the repository.
    #[arg(long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// API root, for GitHub Enterprise installs.
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let local = self
            .local
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.local.display()))?;

        let mut desired = Config::new(self.repo, self.template, local);
        if let Some(content_dir) = self.content_dir {
            desired.content_dir = content_dir;
        }
        if let Some(branch) = self.branch {
            desired.default_branch = branch;
        }
        if let Some(api_base) = self.api_base {
            desired.api_base = api_base;
        }

        let existed = config::config_path_at(&home).exists();
        let saved = config::init_at(&home, desired, self.force)
            .context("failed to write sitesync config")?;

        if existed && !self.force {
            println!(
                "Already initialized for '{}'; pass --force to overwrite.",
                saved.repository
            );
            return Ok(());
        }
        println!(
            "✓ Initialized '{}' (template '{}')",
            saved.repository, saved.template
        );
        println!("  Notes:    {}", saved.local_content_dir.display());
        println!("  Saved to: ~/.sitesync/config.yaml");
        Ok(())
    }
}
