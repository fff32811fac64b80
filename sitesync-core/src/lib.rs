//! sitesync core library: domain types, template manifest, configuration
//! and pull-request history persistence.
//!
//! - [`types`]: newtypes and domain structs
//! - [`manifest`]: the tracked/deprecated/customization file lists
//! - [`config`]: `~/.sitesync/config.yaml` load / save
//! - [`history`]: append-only record of opened pull requests
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod history;
pub mod manifest;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use history::{HistoryEntry, PullRequestHistory};
pub use manifest::TemplateManifest;
pub use types::{
    CommitSha, ContentAddress, ContentUnit, RemoteFile, RemoteSnapshot, RepoSlug, SyncBranch,
    TemplateRelease,
};
