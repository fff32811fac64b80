//! Error types for sitesync-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;

/// Pipeline step a remote failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    ResolveLatestVersion,
    EnsureBranch,
    DeleteDeprecatedFiles,
    EnsureCustomizationFile,
    SyncTrackedFiles,
    ProposeChange,
    ListRemoteContent,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStep::ResolveLatestVersion => "resolving latest template version",
            SyncStep::EnsureBranch => "ensuring sync branch",
            SyncStep::DeleteDeprecatedFiles => "deleting deprecated files",
            SyncStep::EnsureCustomizationFile => "ensuring customization file",
            SyncStep::SyncTrackedFiles => "syncing tracked files",
            SyncStep::ProposeChange => "opening pull request",
            SyncStep::ListRemoteContent => "listing remote content",
        };
        f.write_str(name)
    }
}

/// All errors that can arise from reconciliation and template sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed in `step`.
    #[error("{step} failed: {source}")]
    Remote {
        step: SyncStep,
        #[source]
        source: RemoteError,
    },

    /// The upstream template has never published a release.
    #[error("template {template} has no published release")]
    NoRelease { template: String },

    /// A tracked file failed; `completed` files before it were reconciled.
    #[error("syncing {path} failed after {completed} of {total} tracked files: {source}")]
    TrackedFile {
        path: String,
        completed: usize,
        total: usize,
        #[source]
        source: RemoteError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Walking the local content directory failed.
    #[error("cannot walk local content: {0}")]
    Walk(#[from] walkdir::Error),
}

impl SyncError {
    /// The underlying remote failure, if any.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            SyncError::Remote { source, .. } | SyncError::TrackedFile { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.remote().is_some_and(RemoteError::is_auth)
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Attach the pipeline step to a remote failure.
pub(crate) fn at(step: SyncStep) -> impl FnOnce(RemoteError) -> SyncError {
    move |source| SyncError::Remote { step, source }
}
