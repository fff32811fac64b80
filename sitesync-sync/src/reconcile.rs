//! Publish-status reconciliation: local content × remote snapshot.
//!
//! Every local path lands in exactly one of `published`, `changed`,
//! `unpublished`; every remote path with no local counterpart lands in
//! `deleted`. Local order is preserved for the first three sets, snapshot
//! order for `deleted`. Pure: no I/O, cannot fail.

use std::collections::HashSet;

use serde::Serialize;

use sitesync_core::{ContentUnit, RemoteSnapshot};

use crate::hasher::hash_bytes;

/// Publish state of a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    /// Remote content matches local content.
    Published,
    /// Present remotely with different content.
    Changed,
    /// Local only.
    Unpublished,
    /// Remote only.
    Deleted,
}

/// Four disjoint sets covering `paths(local) ∪ paths(remote)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishPartition {
    pub published: Vec<String>,
    pub changed: Vec<String>,
    pub unpublished: Vec<String>,
    pub deleted: Vec<String>,
}

impl PublishPartition {
    /// Status of `path`, or `None` if it is in neither input.
    pub fn status_of(&self, path: &str) -> Option<PublishStatus> {
        let contains = |set: &[String]| set.iter().any(|p| p == path);
        if contains(&self.published) {
            Some(PublishStatus::Published)
        } else if contains(&self.changed) {
            Some(PublishStatus::Changed)
        } else if contains(&self.unpublished) {
            Some(PublishStatus::Unpublished)
        } else if contains(&self.deleted) {
            Some(PublishStatus::Deleted)
        } else {
            None
        }
    }

    /// Every path with its status, local paths first.
    pub fn entries(&self) -> impl Iterator<Item = (&str, PublishStatus)> {
        tagged(&self.published, PublishStatus::Published)
            .chain(tagged(&self.changed, PublishStatus::Changed))
            .chain(tagged(&self.unpublished, PublishStatus::Unpublished))
            .chain(tagged(&self.deleted, PublishStatus::Deleted))
    }

    pub fn len(&self) -> usize {
        self.published.len() + self.changed.len() + self.unpublished.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether anything needs publishing or removing.
    pub fn has_pending(&self) -> bool {
        !(self.changed.is_empty() && self.unpublished.is_empty() && self.deleted.is_empty())
    }
}

fn tagged(
    set: &[String],
    status: PublishStatus,
) -> impl Iterator<Item = (&str, PublishStatus)> + '_ {
    set.iter().map(move |p| (p.as_str(), status))
}

/// Classify every local unit and every remote path. O(n + m).
///
/// Local paths are the unique key of the local set: a repeated path keeps
/// its first occurrence.
pub fn reconcile(local: &[ContentUnit], remote: &RemoteSnapshot) -> PublishPartition {
    let mut partition = PublishPartition::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(local.len());

    for unit in local {
        if !seen.insert(unit.path.as_str()) {
            tracing::warn!("duplicate local path ignored: {}", unit.path);
            continue;
        }
        match remote.get(&unit.path) {
            None => partition.unpublished.push(unit.path.clone()),
            Some(address) if *address == hash_bytes(&unit.raw) => {
                partition.published.push(unit.path.clone())
            }
            Some(_) => partition.changed.push(unit.path.clone()),
        }
    }

    for (path, _) in remote.iter() {
        if !seen.contains(path) {
            partition.deleted.push(path.to_string());
        }
    }

    tracing::debug!(
        "reconciled {} local / {} remote: {} published, {} changed, {} unpublished, {} deleted",
        local.len(),
        remote.len(),
        partition.published.len(),
        partition.changed.len(),
        partition.unpublished.len(),
        partition.deleted.len()
    );
    partition
}
