//! Domain types shared by the reconciler, the template workflow and the
//! remote adapters.
//!
//! Remote paths are always `/`-separated strings, never `PathBuf`: they name
//! entries in a remote tree, not files on the local disk.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Content address of a blob, as reported by the remote store (lower-case hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(pub String);

impl ContentAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContentAddress {
    fn from(s: String) -> Self {
        Self(s.to_ascii_lowercase())
    }
}

impl From<&str> for ContentAddress {
    fn from(s: &str) -> Self {
        Self(s.to_ascii_lowercase())
    }
}

/// A commit id on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitSha(pub String);

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CommitSha {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for CommitSha {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// `owner/name` identifier of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// File-name-safe key, used for per-repository state files.
    pub fn file_key(&self) -> String {
        format!("{}__{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(format!("invalid repository '{s}'; expected owner/name")),
        }
    }
}

impl TryFrom<String> for RepoSlug {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RepoSlug> for String {
    fn from(slug: RepoSlug) -> Self {
        slug.to_string()
    }
}

// ---------------------------------------------------------------------------
// Local content
// ---------------------------------------------------------------------------

/// A locally authored unit of content, keyed by its remote-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    pub path: String,
    pub raw: Vec<u8>,
}

impl ContentUnit {
    pub fn new(path: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            raw: raw.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote snapshot
// ---------------------------------------------------------------------------

/// Insertion-ordered `path -> address` view of the remote content mirror.
///
/// Re-inserting a path replaces its address in place and keeps the original
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSnapshot {
    entries: Vec<(String, ContentAddress)>,
    index: HashMap<String, usize>,
}

impl RemoteSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, address: ContentAddress) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = address,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, address));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&ContentAddress> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentAddress)> {
        self.entries.iter().map(|(p, a)| (p.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>> FromIterator<(P, ContentAddress)> for RemoteSnapshot {
    fn from_iter<I: IntoIterator<Item = (P, ContentAddress)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (path, address) in iter {
            snapshot.insert(path, address);
        }
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Template sync entities
// ---------------------------------------------------------------------------

/// Latest published release of the upstream template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRelease {
    pub version: String,
    /// Link to the release notes, when the host provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_url: Option<String>,
}

/// Branch staging one template update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncBranch {
    pub name: String,
    pub base_commit: CommitSha,
}

/// A file read from the remote: its address plus raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub address: ContentAddress,
    pub content: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_slug_parses_owner_and_name() {
        let slug: RepoSlug = "octo/blog".parse().expect("parse");
        assert_eq!(slug, RepoSlug::new("octo", "blog"));
        assert_eq!(slug.to_string(), "octo/blog");
        assert_eq!(slug.file_key(), "octo__blog");
    }

    #[test]
    fn repo_slug_rejects_malformed_input() {
        assert!("octo".parse::<RepoSlug>().is_err());
        assert!("octo/".parse::<RepoSlug>().is_err());
        assert!("a/b/c".parse::<RepoSlug>().is_err());
    }

    #[test]
    fn repo_slug_serde_uses_string_form() {
        let yaml = serde_yaml::to_string(&RepoSlug::new("octo", "blog")).expect("serialize");
        assert_eq!(yaml.trim(), "octo/blog");
        let back: RepoSlug = serde_yaml::from_str("octo/blog").expect("deserialize");
        assert_eq!(back.name, "blog");
    }

    #[test]
    fn content_address_is_case_insensitive_on_input() {
        assert_eq!(ContentAddress::from("ABCDEF"), ContentAddress::from("abcdef"));
    }

    #[test]
    fn snapshot_keeps_insertion_order_and_replaces_in_place() {
        let mut snap = RemoteSnapshot::new();
        snap.insert("b.md", ContentAddress::from("02"));
        snap.insert("a.md", ContentAddress::from("01"));
        snap.insert("b.md", ContentAddress::from("03"));

        let paths: Vec<_> = snap.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["b.md", "a.md"]);
        assert_eq!(snap.get("b.md"), Some(&ContentAddress::from("03")));
        assert_eq!(snap.len(), 2);
        assert!(snap.get("c.md").is_none());
    }
}
