//! Pull-request history: append-only record of change proposals.
//!
//! Persists a JSON document at
//! `<home>/.sitesync/history/<owner>__<name>.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the config.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{home, set_file_permissions, state_dir_at};
use crate::error::{io_err, ConfigError};
use crate::types::RepoSlug;

/// One opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: String,
    pub branch: String,
    pub url: String,
    pub opened_at: DateTime<Utc>,
}

/// On-disk history payload, oldest entry first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestHistory {
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
}

impl PullRequestHistory {
    /// Append `entry` unless its URL is already recorded.
    ///
    /// Returns whether the history changed.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        if self.urls().any(|u| u == entry.url) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.url.as_str())
    }
}

/// `<home>/.sitesync/history/<owner>__<name>.json`: pure, no I/O.
pub fn history_path_at(home: &Path, repo: &RepoSlug) -> PathBuf {
    state_dir_at(home)
        .join("history")
        .join(format!("{}.json", repo.file_key()))
}

/// Load the history for `repo`. Returns an empty history if the file does not
/// yet exist.
pub fn load_at(home: &Path, repo: &RepoSlug) -> Result<PullRequestHistory, ConfigError> {
    let path = history_path_at(home, repo);
    if !path.exists() {
        return Ok(PullRequestHistory::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::Json { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load(repo: &RepoSlug) -> Result<PullRequestHistory, ConfigError> {
    load_at(&home()?, repo)
}

/// Save the history for `repo` atomically.
pub fn save_at(
    home: &Path,
    repo: &RepoSlug,
    history: &PullRequestHistory,
) -> Result<(), ConfigError> {
    let path = history_path_at(home, repo);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid history path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(history).map_err(|e| ConfigError::Json {
        path: path.clone(),
        source: e,
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Load, append, save. Returns whether a new entry was written.
pub fn record_at(home: &Path, repo: &RepoSlug, entry: HistoryEntry) -> Result<bool, ConfigError> {
    let mut history = load_at(home, repo)?;
    if !history.push(entry) {
        return Ok(false);
    }
    save_at(home, repo, &history)?;
    Ok(true)
}

/// `record_at` convenience wrapper.
pub fn record(repo: &RepoSlug, entry: HistoryEntry) -> Result<bool, ConfigError> {
    record_at(&home()?, repo, entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> RepoSlug {
        RepoSlug::new("octo", "garden")
    }

    fn entry(url: &str) -> HistoryEntry {
        HistoryEntry {
            version: "2.56.2".into(),
            branch: "update-template-to-v2.56.2".into(),
            url: url.into(),
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn empty_history_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let history = load_at(tmp.path(), &repo()).unwrap();
        assert!(history.entries.is_empty());
    }

    #[test]
    fn record_appends_in_order() {
        let tmp = TempDir::new().unwrap();
        assert!(record_at(tmp.path(), &repo(), entry("https://x/pull/1")).unwrap());
        assert!(record_at(tmp.path(), &repo(), entry("https://x/pull/2")).unwrap());

        let history = load_at(tmp.path(), &repo()).unwrap();
        let urls: Vec<_> = history.urls().collect();
        assert_eq!(urls, vec!["https://x/pull/1", "https://x/pull/2"]);
    }

    #[test]
    fn recording_same_url_twice_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        record_at(tmp.path(), &repo(), entry("https://x/pull/1")).unwrap();
        assert!(!record_at(tmp.path(), &repo(), entry("https://x/pull/1")).unwrap());
        assert_eq!(load_at(tmp.path(), &repo()).unwrap().entries.len(), 1);
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        save_at(tmp.path(), &repo(), &PullRequestHistory::default()).unwrap();
        let tmp_path = history_path_at(tmp.path(), &repo()).with_extension("json.tmp");
        assert!(!tmp_path.exists(), "tmp file should be removed after atomic rename");
    }

    #[test]
    fn corrupt_history_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = history_path_at(tmp.path(), &repo());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let err = load_at(tmp.path(), &repo()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("octo__garden.json"));
    }
}
