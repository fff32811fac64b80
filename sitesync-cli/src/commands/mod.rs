//! Subcommand implementations and the helpers they share.

pub mod history;
pub mod init;
pub mod status;
pub mod template;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use sitesync_core::{config, Config};
use sitesync_github::GitHubClient;

pub(crate) fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn load_config(home: &Path) -> Result<Config> {
    config::load_at(home).context("failed to load sitesync config")
}

/// Clients for the user's repository and for its template.
///
/// Both share the token named by `token_env`; without one, requests are
/// anonymous and every write will be refused.
pub(crate) fn connect(config: &Config) -> Result<(GitHubClient, GitHubClient)> {
    let token = std::env::var(&config.token_env)
        .ok()
        .filter(|t| !t.trim().is_empty());
    if token.is_none() {
        tracing::warn!("${} is not set; using anonymous requests", config.token_env);
    }

    let fork = GitHubClient::new(
        config.repository.clone(),
        &config.default_branch,
        token.as_deref(),
        &config.api_base,
    )
    .with_context(|| format!("cannot create client for {}", config.repository))?;
    let template = GitHubClient::new(
        config.template.clone(),
        &config.template_branch,
        token.as_deref(),
        &config.api_base,
    )
    .with_context(|| format!("cannot create client for {}", config.template))?;
    Ok((fork, template))
}
