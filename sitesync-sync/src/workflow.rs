//! Template synchronization workflow.
//!
//! Brings a user fork up to date with the latest release of its upstream
//! template and proposes the result as a pull request.
//!
//! ## Pipeline
//!
//! 1. Resolve the latest template release (fatal if absent or unreachable).
//! 2. Derive the sync branch name: `<prefix><version>`.
//! 3. Ensure the branch exists, based on the fork's default-branch head.
//! 4. Delete deprecated files from the branch (absence is success; one
//!    retry on an address conflict).
//! 5. Create the customization file from upstream if absent; never overwrite it.
//! 6. Write every tracked file whose branch address differs from upstream.
//! 7. Open a pull request; "no changes" and "already open" are not errors.
//!
//! Each step is idempotent, so re-running after an interruption completes
//! the remaining work, and re-running with no upstream change writes nothing.
//! Step 6 is not transactional across files: [`SyncProgress`] records how far
//! it got so a caller can resume without re-reading finished files.

use sitesync_core::{ContentAddress, RemoteFile, SyncBranch, TemplateManifest, TemplateRelease};

use crate::error::{at, SyncError, SyncStep};
use crate::hasher::hash_bytes;
use crate::remote::{BranchOutcome, DeleteOutcome, PullRequestOutcome, RemoteError, RemoteRepository};

// ---------------------------------------------------------------------------
// Options / results
// ---------------------------------------------------------------------------

/// Knobs for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub branch_prefix: String,
    /// Read-only planning run: no branch, file or pull-request mutations.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            branch_prefix: "update-template-to-v".to_string(),
            dry_run: false,
        }
    }
}

/// How step 3 found the sync branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    Created,
    AlreadyExists,
    /// Dry run: the branch does not exist and would be created.
    WouldCreate,
}

/// What happened (or, in a dry run, would happen) to one managed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Created,
    Updated,
    Deleted,
    /// Address already matches upstream.
    Unchanged,
    /// Deprecated path not on the branch.
    Absent,
    /// Customization file left as the user has it.
    Preserved,
    /// Upstream has no such file; nothing to copy.
    MissingUpstream,
    WouldCreate,
    WouldUpdate,
    WouldDelete,
}

impl FileAction {
    /// Whether this action mutated the remote.
    pub fn is_write(self) -> bool {
        matches!(self, FileAction::Created | FileAction::Updated | FileAction::Deleted)
    }

    /// Whether this action would mutate the remote in a real run.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            FileAction::WouldCreate | FileAction::WouldUpdate | FileAction::WouldDelete
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: String,
    pub action: FileAction,
}

impl FileOutcome {
    fn new(path: &str, action: FileAction) -> Self {
        Self {
            path: path.to_string(),
            action,
        }
    }
}

/// Resumable cursor over the tracked-file manifest.
///
/// `cursor` counts tracked files already reconciled for `version`. Progress
/// recorded for another version is discarded when a run starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncProgress {
    version: Option<String>,
    cursor: usize,
    outcomes: Vec<FileOutcome>,
}

impl SyncProgress {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    pub fn is_complete(&self, total: usize) -> bool {
        self.cursor >= total
    }

    fn start(&mut self, version: &str) {
        if self.version.as_deref() != Some(version) {
            *self = SyncProgress {
                version: Some(version.to_string()),
                ..SyncProgress::default()
            };
        }
    }

    fn advance(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
        self.cursor += 1;
    }
}

/// How step 7 ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Opened,
    /// The branch has no difference from the default branch.
    NoChanges,
    /// A pull request for the branch was already open.
    AlreadyOpen,
    /// Dry run: no pull request was attempted.
    Skipped,
}

/// Everything a run did, step by step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub release: TemplateRelease,
    /// The sync branch. `base_commit` is the default-branch head it was (or
    /// would be) created at, or its own head when it already existed.
    pub branch: SyncBranch,
    pub branch_status: BranchStatus,
    pub deprecated: Vec<FileOutcome>,
    pub customization: FileOutcome,
    pub tracked: Vec<FileOutcome>,
    /// Pull-request URL, set only when this run opened one.
    pub proposal: Option<String>,
    pub proposal_status: ProposalStatus,
    pub dry_run: bool,
}

impl SyncReport {
    fn all_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.deprecated
            .iter()
            .chain(std::iter::once(&self.customization))
            .chain(self.tracked.iter())
    }

    /// Number of file mutations performed.
    pub fn writes(&self) -> usize {
        self.all_files().filter(|o| o.action.is_write()).count()
    }

    /// Number of file mutations a dry run planned.
    pub fn pending(&self) -> usize {
        self.all_files().filter(|o| o.action.is_pending()).count()
    }
}

/// Deterministic sync branch name for `version`.
pub fn branch_name(prefix: &str, version: &str) -> String {
    format!("{prefix}{}", version.trim_start_matches('v'))
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Sequential template-sync pipeline over a fork and its upstream template.
pub struct TemplateSync<'a> {
    fork: &'a dyn RemoteRepository,
    template: &'a dyn RemoteRepository,
    manifest: &'a TemplateManifest,
    options: SyncOptions,
}

impl<'a> TemplateSync<'a> {
    pub fn new(
        fork: &'a dyn RemoteRepository,
        template: &'a dyn RemoteRepository,
        manifest: &'a TemplateManifest,
        options: SyncOptions,
    ) -> Self {
        Self {
            fork,
            template,
            manifest,
            options,
        }
    }

    /// Run the whole pipeline from scratch.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let mut progress = SyncProgress::default();
        self.run_with_progress(&mut progress).await
    }

    /// Run the pipeline, resuming step 6 from `progress` when it belongs to
    /// the same template version. A dry run never advances `progress`.
    pub async fn run_with_progress(
        &self,
        progress: &mut SyncProgress,
    ) -> Result<SyncReport, SyncError> {
        let release = self.resolve_latest_version().await?;
        let branch = branch_name(&self.options.branch_prefix, &release.version);
        tracing::info!("template {} resolved; sync branch {branch}", release.version);

        let (branch_status, branch, target) = self.ensure_branch(branch).await?;
        let deprecated = self.delete_deprecated_files(&target).await?;
        let customization = self.ensure_customization_file(&target).await?;

        let tracked = if self.options.dry_run {
            let mut scratch = progress.clone();
            self.sync_tracked_files(&target, &release.version, &mut scratch)
                .await?;
            scratch.outcomes
        } else {
            self.sync_tracked_files(&target, &release.version, progress)
                .await?;
            progress.outcomes.clone()
        };

        let (proposal_status, proposal) = if self.options.dry_run {
            (ProposalStatus::Skipped, None)
        } else {
            self.propose_change(&release, &branch.name).await?
        };

        Ok(SyncReport {
            release,
            branch,
            branch_status,
            deprecated,
            customization,
            tracked,
            proposal,
            proposal_status,
            dry_run: self.options.dry_run,
        })
    }

    // -- step 1 -------------------------------------------------------------

    async fn resolve_latest_version(&self) -> Result<TemplateRelease, SyncError> {
        self.template
            .latest_release()
            .await
            .map_err(at(SyncStep::ResolveLatestVersion))?
            .ok_or_else(|| SyncError::NoRelease {
                template: self.template.repository().to_string(),
            })
    }

    // -- step 3 -------------------------------------------------------------

    /// Returns the branch status, the branch, and the ref later steps read
    /// from. A dry run against a branch that does not exist yet reads the
    /// default branch, which is what the new branch would start from.
    async fn ensure_branch(
        &self,
        name: String,
    ) -> Result<(BranchStatus, SyncBranch, String), SyncError> {
        let step = SyncStep::EnsureBranch;
        if self.options.dry_run {
            if let Some(head) = self.fork.branch_head(&name).await.map_err(at(step))? {
                let target = name.clone();
                return Ok((
                    BranchStatus::AlreadyExists,
                    SyncBranch {
                        name,
                        base_commit: head,
                    },
                    target,
                ));
            }
            let base = self.fork.default_branch_head().await.map_err(at(step))?;
            return Ok((
                BranchStatus::WouldCreate,
                SyncBranch {
                    name,
                    base_commit: base,
                },
                self.fork.default_branch().to_string(),
            ));
        }

        let head = self.fork.default_branch_head().await.map_err(at(step))?;
        let (status, base_commit) =
            match self.fork.create_branch(&name, &head).await.map_err(at(step))? {
                BranchOutcome::Created => {
                    tracing::info!("created branch {name} at {head}");
                    (BranchStatus::Created, head)
                }
                BranchOutcome::AlreadyExists => {
                    tracing::debug!("branch {name} already exists");
                    let existing = self.fork.branch_head(&name).await.map_err(at(step))?;
                    (BranchStatus::AlreadyExists, existing.unwrap_or(head))
                }
            };
        let target = name.clone();
        Ok((status, SyncBranch { name, base_commit }, target))
    }

    // -- step 4 -------------------------------------------------------------

    async fn delete_deprecated_files(&self, target: &str) -> Result<Vec<FileOutcome>, SyncError> {
        let mut outcomes = Vec::with_capacity(self.manifest.deprecated.len());
        for path in &self.manifest.deprecated {
            let action = if self.options.dry_run {
                match self.fork.get_file(path, target).await {
                    Ok(Some(_)) => FileAction::WouldDelete,
                    Ok(None) => FileAction::Absent,
                    Err(e) => return Err(at(SyncStep::DeleteDeprecatedFiles)(e)),
                }
            } else {
                self.delete_deprecated(path, target)
                    .await
                    .map_err(at(SyncStep::DeleteDeprecatedFiles))?
            };
            outcomes.push(FileOutcome::new(path, action));
        }
        Ok(outcomes)
    }

    /// Delete with one retry on an address conflict. The adapter re-reads
    /// the address on every call, so the retry targets the fresh blob.
    async fn delete_deprecated(&self, path: &str, target: &str) -> Result<FileAction, RemoteError> {
        let message = format!("Delete deprecated template file {path}");
        let outcome = match self.fork.delete_file(path, target, &message).await {
            Err(RemoteError::Conflict { .. }) => {
                tracing::warn!("{path}: changed while deleting; retrying once");
                self.fork.delete_file(path, target, &message).await?
            }
            other => other?,
        };
        Ok(match outcome {
            DeleteOutcome::Deleted => {
                tracing::info!("deleted deprecated file {path}");
                FileAction::Deleted
            }
            DeleteOutcome::Absent => FileAction::Absent,
        })
    }

    // -- step 5 -------------------------------------------------------------

    async fn ensure_customization_file(&self, target: &str) -> Result<FileOutcome, SyncError> {
        let path = self.manifest.customization.as_str();
        let step = SyncStep::EnsureCustomizationFile;

        if self.fork.get_file(path, target).await.map_err(at(step))?.is_some() {
            tracing::debug!("customization file {path} present; left untouched");
            return Ok(FileOutcome::new(path, FileAction::Preserved));
        }

        let Some(upstream) = self.upstream_file(path).await.map_err(at(step))? else {
            tracing::warn!("template has no customization file {path}");
            return Ok(FileOutcome::new(path, FileAction::MissingUpstream));
        };
        if self.options.dry_run {
            return Ok(FileOutcome::new(path, FileAction::WouldCreate));
        }

        let message = format!("Add {path} from template");
        match self
            .fork
            .put_file(path, &upstream.content, target, &message, None)
            .await
        {
            Ok(_) => {
                tracing::info!("created customization file {path}");
                Ok(FileOutcome::new(path, FileAction::Created))
            }
            // Created concurrently: whoever wrote it owns it now.
            Err(RemoteError::Conflict { .. }) => {
                tracing::warn!("customization file {path} appeared during sync; preserving it");
                Ok(FileOutcome::new(path, FileAction::Preserved))
            }
            Err(e) => Err(at(step)(e)),
        }
    }

    // -- step 6 -------------------------------------------------------------

    async fn sync_tracked_files(
        &self,
        target: &str,
        version: &str,
        progress: &mut SyncProgress,
    ) -> Result<(), SyncError> {
        progress.start(version);
        let total = self.manifest.tracked.len();
        if progress.cursor > 0 {
            tracing::info!("resuming tracked-file sync at {}/{total}", progress.cursor);
        }

        for path in self.manifest.tracked.iter().skip(progress.cursor) {
            let action = self
                .sync_tracked_file(path, target)
                .await
                .map_err(|source| SyncError::TrackedFile {
                    path: path.clone(),
                    completed: progress.cursor,
                    total,
                    source,
                })?;
            if action.is_write() {
                tracing::info!("{path}: {action:?}");
            } else {
                tracing::debug!("{path}: {action:?}");
            }
            progress.advance(FileOutcome::new(path, action));
        }
        Ok(())
    }

    async fn sync_tracked_file(&self, path: &str, target: &str) -> Result<FileAction, RemoteError> {
        let Some(upstream) = self.upstream_file(path).await? else {
            tracing::warn!("tracked file {path} missing from template; skipped");
            return Ok(FileAction::MissingUpstream);
        };
        let current = self.fork.get_file(path, target).await?;

        match current {
            Some(current) if current.address == upstream.address => Ok(FileAction::Unchanged),
            Some(_) if self.options.dry_run => Ok(FileAction::WouldUpdate),
            None if self.options.dry_run => Ok(FileAction::WouldCreate),
            current => {
                let preceding = current.map(|c| c.address);
                self.write_tracked(path, &upstream, target, preceding).await
            }
        }
    }

    /// Conditional write with one retry on an address conflict.
    async fn write_tracked(
        &self,
        path: &str,
        upstream: &RemoteFile,
        target: &str,
        preceding: Option<ContentAddress>,
    ) -> Result<FileAction, RemoteError> {
        let message = format!("Update {path} from template");
        let action = |p: &Option<ContentAddress>| {
            if p.is_some() {
                FileAction::Updated
            } else {
                FileAction::Created
            }
        };

        match self
            .fork
            .put_file(path, &upstream.content, target, &message, preceding.as_ref())
            .await
        {
            Ok(_) => return Ok(action(&preceding)),
            Err(RemoteError::Conflict { .. }) => {
                tracing::warn!("{path}: address changed under us; re-reading and retrying once");
            }
            Err(e) => return Err(e),
        }

        let fresh = self.fork.get_file(path, target).await?.map(|f| f.address);
        if fresh.as_ref() == Some(&upstream.address) {
            return Ok(FileAction::Unchanged);
        }
        self.fork
            .put_file(path, &upstream.content, target, &message, fresh.as_ref())
            .await?;
        Ok(action(&fresh))
    }

    /// Upstream file at the template's default branch, with its address
    /// recomputed locally from the bytes.
    async fn upstream_file(&self, path: &str) -> Result<Option<RemoteFile>, RemoteError> {
        let file = self
            .template
            .get_file(path, self.template.default_branch())
            .await?;
        Ok(file.map(|f| RemoteFile {
            address: hash_bytes(&f.content),
            content: f.content,
        }))
    }

    // -- step 7 -------------------------------------------------------------

    async fn propose_change(
        &self,
        release: &TemplateRelease,
        branch: &str,
    ) -> Result<(ProposalStatus, Option<String>), SyncError> {
        let title = format!("Update template to version {}", release.version);
        let body = match &release.notes_url {
            Some(url) => format!(
                "Update to the latest template version {}.\n\n[Release notes]({url})",
                release.version
            ),
            None => format!("Update to the latest template version {}.", release.version),
        };

        match self
            .fork
            .open_pull_request(branch, &title, &body)
            .await
            .map_err(at(SyncStep::ProposeChange))?
        {
            PullRequestOutcome::Opened { url } => {
                tracing::info!("opened pull request {url}");
                Ok((ProposalStatus::Opened, Some(url)))
            }
            PullRequestOutcome::NoChanges => {
                tracing::info!("fork already up to date with template {}", release.version);
                Ok((ProposalStatus::NoChanges, None))
            }
            PullRequestOutcome::AlreadyOpen => {
                tracing::info!("a pull request for {branch} is already open");
                Ok((ProposalStatus::AlreadyOpen, None))
            }
        }
    }
}
