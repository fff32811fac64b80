//! Contract for the remote git-hosting collaborator.
//!
//! One [`RemoteRepository`] targets one repository. Expected absence is never
//! an error: lookups return `Option`, and operations with a benign "already
//! satisfied" case return an outcome enum. [`RemoteError`] is reserved for
//! failures the caller must see.

use async_trait::async_trait;
use thiserror::Error;

use sitesync_core::{
    CommitSha, ContentAddress, RemoteFile, RemoteSnapshot, RepoSlug, TemplateRelease,
};

/// Failures reported by a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// A resource the operation depends on (not the looked-up file) is missing,
    /// e.g. the target branch of a write.
    #[error("not found: {0}")]
    NotFound(String),

    /// The address precondition of a write did not match the remote.
    #[error("conflict writing {path}: remote content changed since it was read")]
    Conflict { path: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("unexpected response {status}: {message}")]
    Unexpected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Authentication or permission failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Forbidden(_))
    }
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The path was not on the branch; nothing changed.
    Absent,
}

/// Result of a branch creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    Created,
    AlreadyExists,
}

/// Result of a pull-request creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestOutcome {
    Opened { url: String },
    /// The head branch has no commits the base lacks.
    NoChanges,
    /// A pull request for this head branch is already open.
    AlreadyOpen,
}

/// Operations the reconciler and the template workflow need from the host.
///
/// Every call is a single remote round-trip; implementations must not cache
/// across calls.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Repository this client targets.
    fn repository(&self) -> &RepoSlug;

    /// Branch that pull requests target and that upstream content is read from.
    fn default_branch(&self) -> &str;

    /// Address and bytes of `path` at `reference`; `None` if absent.
    async fn get_file(&self, path: &str, reference: &str)
        -> Result<Option<RemoteFile>, RemoteError>;

    /// Create or replace `path` on `branch`.
    ///
    /// `preceding` must carry the current address when the file exists and be
    /// `None` when creating. Returns the new address.
    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        branch: &str,
        message: &str,
        preceding: Option<&ContentAddress>,
    ) -> Result<ContentAddress, RemoteError>;

    async fn delete_file(
        &self,
        path: &str,
        branch: &str,
        message: &str,
    ) -> Result<DeleteOutcome, RemoteError>;

    async fn create_branch(&self, name: &str, base: &CommitSha)
        -> Result<BranchOutcome, RemoteError>;

    /// Head commit of `branch`; `None` if the branch does not exist.
    async fn branch_head(&self, branch: &str) -> Result<Option<CommitSha>, RemoteError>;

    async fn default_branch_head(&self) -> Result<CommitSha, RemoteError> {
        let branch = self.default_branch().to_string();
        self.branch_head(&branch)
            .await?
            .ok_or(RemoteError::NotFound(format!("branch '{branch}'")))
    }

    async fn latest_release(&self) -> Result<Option<TemplateRelease>, RemoteError>;

    /// Open a pull request from `branch` into the default branch.
    async fn open_pull_request(
        &self,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestOutcome, RemoteError>;

    /// Blob addresses under `prefix` at `reference`, keyed relative to `prefix`.
    async fn list_tree(&self, reference: &str, prefix: &str)
        -> Result<RemoteSnapshot, RemoteError>;
}
