//! # sitesync-github
//!
//! [`GitHubClient`] implements [`sitesync_sync::RemoteRepository`] over the
//! GitHub REST API. Contents travel base64-encoded; addresses are the blob
//! `sha` values GitHub reports.

mod client;
mod error;
mod wire;

pub use client::GitHubClient;
pub use error::GitHubError;
