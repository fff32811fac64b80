//! Unified diff of tracked template files for `sitesync template diff`.
//!
//! Read-only: compares the fork at a ref against the template's default
//! branch, skipping files whose addresses already match.

use similar::TextDiff;

use sitesync_core::TemplateManifest;

use crate::error::{at, SyncError, SyncStep};
use crate::hasher::hash_bytes;
use crate::remote::RemoteRepository;

/// A single tracked file that differs from upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    /// `false` when the fork has no such file yet.
    pub exists_in_fork: bool,
    pub unified_diff: String,
}

/// Diff every tracked file of `manifest` between `fork@reference` and the
/// template. The customization file is never diffed.
pub async fn diff_tracked_files(
    fork: &dyn RemoteRepository,
    template: &dyn RemoteRepository,
    manifest: &TemplateManifest,
    reference: &str,
) -> Result<Vec<FileDiff>, SyncError> {
    let step = SyncStep::SyncTrackedFiles;
    let mut diffs = Vec::new();

    for path in &manifest.tracked {
        let Some(upstream) = template
            .get_file(path, template.default_branch())
            .await
            .map_err(at(step))?
        else {
            continue;
        };
        let current = fork.get_file(path, reference).await.map_err(at(step))?;
        if current.as_ref().map(|c| &c.address) == Some(&hash_bytes(&upstream.content)) {
            continue;
        }

        let existing = current.as_ref().map(|c| c.content.as_slice()).unwrap_or(&[]);
        diffs.push(FileDiff {
            path: path.clone(),
            exists_in_fork: current.is_some(),
            unified_diff: render(path, existing, &upstream.content),
        });
    }

    tracing::debug!("{} tracked file(s) differ from template", diffs.len());
    Ok(diffs)
}

fn render(path: &str, old: &[u8], new: &[u8]) -> String {
    let old_header = format!("a/{path}");
    let new_header = format!("b/{path}");
    match (std::str::from_utf8(old), std::str::from_utf8(new)) {
        (Ok(old), Ok(new)) => {
            let old = normalize_line_endings(old);
            let new = normalize_line_endings(new);
            TextDiff::from_lines(&old, &new)
                .unified_diff()
                .header(&old_header, &new_header)
                .context_radius(3)
                .to_string()
        }
        _ => format!("Binary files {old_header} and {new_header} differ\n"),
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
