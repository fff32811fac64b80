//! Shared entrypoints used by the CLI: each wires a loaded [`Config`] to
//! one reconciliation.

use sitesync_core::Config;

use crate::diff::{diff_tracked_files, FileDiff};
use crate::error::{at, SyncError, SyncStep};
use crate::local::collect_units;
use crate::reconcile::{reconcile, PublishPartition};
use crate::remote::RemoteRepository;
use crate::workflow::{SyncOptions, SyncReport, TemplateSync};

/// Collect local content, list the remote content folder on the default
/// branch, and partition the two.
pub async fn publish_status(
    fork: &dyn RemoteRepository,
    config: &Config,
) -> Result<PublishPartition, SyncError> {
    let units = collect_units(&config.local_content_dir, &config.extensions)?;
    let snapshot = fork
        .list_tree(fork.default_branch(), &config.content_dir)
        .await
        .map_err(at(SyncStep::ListRemoteContent))?;
    Ok(reconcile(&units, &snapshot))
}

/// Run the template workflow with the configured manifest and branch prefix.
pub async fn template_sync(
    fork: &dyn RemoteRepository,
    template: &dyn RemoteRepository,
    config: &Config,
    dry_run: bool,
) -> Result<SyncReport, SyncError> {
    let manifest = config.manifest();
    let options = SyncOptions {
        branch_prefix: config.branch_prefix.clone(),
        dry_run,
    };
    TemplateSync::new(fork, template, &manifest, options)
        .run()
        .await
}

/// Diff tracked files between the fork's default branch and the template.
pub async fn template_diff(
    fork: &dyn RemoteRepository,
    template: &dyn RemoteRepository,
    config: &Config,
) -> Result<Vec<FileDiff>, SyncError> {
    let manifest = config.manifest();
    diff_tracked_files(fork, template, &manifest, fork.default_branch()).await
}
