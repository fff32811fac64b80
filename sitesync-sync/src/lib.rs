//! # sitesync-sync
//!
//! Content-addressed reconciliation between local content, a user-owned
//! remote repository, and the upstream template that repository was forked
//! from.
//!
//! - [`reconcile`] partitions local content against a remote snapshot.
//! - [`TemplateSync`] stages template updates on a branch and proposes them.
//! - [`pipeline`] wires both to a loaded [`sitesync_core::Config`].

pub mod diff;
pub mod error;
pub mod hasher;
pub mod local;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod workflow;

pub use error::{SyncError, SyncStep};
pub use hasher::hash_bytes;
pub use reconcile::{reconcile, PublishPartition, PublishStatus};
pub use remote::{BranchOutcome, DeleteOutcome, PullRequestOutcome, RemoteError, RemoteRepository};
pub use workflow::{
    branch_name, BranchStatus, FileAction, FileOutcome, ProposalStatus, SyncOptions, SyncProgress,
    SyncReport, TemplateSync,
};
