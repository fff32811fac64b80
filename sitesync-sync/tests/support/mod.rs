//! In-memory [`RemoteRepository`] used by the integration tests.
//!
//! Branches are full file maps; creating a branch copies its base. Writes
//! honour the address precondition the same way the hosting API does.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use sitesync_core::{
    CommitSha, ContentAddress, RemoteFile, RemoteSnapshot, RepoSlug, TemplateRelease,
};
use sitesync_sync::{
    hash_bytes, BranchOutcome, DeleteOutcome, PullRequestOutcome, RemoteError, RemoteRepository,
};

type Files = BTreeMap<String, Vec<u8>>;

#[derive(Default)]
struct State {
    branches: HashMap<String, Files>,
    heads: HashMap<String, u32>,
    release: Option<TemplateRelease>,
    pulls: Vec<(String, String, bool)>,
    writes: usize,
    deletes: usize,
    failures: HashMap<&'static str, VecDeque<RemoteError>>,
    foreign_writes: HashMap<String, Vec<Vec<u8>>>,
}

pub struct MemoryRepo {
    slug: RepoSlug,
    default_branch: String,
    state: Mutex<State>,
}

impl MemoryRepo {
    pub fn new(slug: &str) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut state = State::default();
        state.branches.insert("main".to_string(), Files::new());
        state.heads.insert("main".to_string(), 1);
        Self {
            slug: slug.parse().expect("slug"),
            default_branch: "main".to_string(),
            state: Mutex::new(state),
        }
    }

    pub fn with_release(self, version: &str) -> Self {
        self.set_release(version);
        self
    }

    pub fn with_file(self, branch: &str, path: &str, content: &str) -> Self {
        self.seed(branch, path, content);
        self
    }

    pub fn set_release(&self, version: &str) {
        self.state.lock().unwrap().release = Some(TemplateRelease {
            version: version.to_string(),
            notes_url: Some(format!("https://example.test/releases/tag/{version}")),
        });
    }

    /// Write directly, bypassing counters and preconditions.
    pub fn seed(&self, branch: &str, path: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .branches
            .entry(branch.to_string())
            .or_default()
            .insert(path.to_string(), content.as_bytes().to_vec());
        *state.heads.entry(branch.to_string()).or_insert(0) += 1;
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .branches
            .get(branch)?
            .get(path)
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.state.lock().unwrap().branches.contains_key(branch)
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().unwrap().deletes
    }

    pub fn open_pulls(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .pulls
            .iter()
            .filter(|(_, _, open)| *open)
            .map(|(_, url, _)| url.clone())
            .collect()
    }

    /// Merge `branch` into the default branch and close its pull request.
    pub fn merge(&self, branch: &str) {
        let mut state = self.state.lock().unwrap();
        let files = state.branches.get(branch).cloned().unwrap_or_default();
        state.branches.insert("main".to_string(), files);
        *state.heads.entry("main".to_string()).or_insert(0) += 1;
        for pull in state.pulls.iter_mut().filter(|(b, _, _)| b == branch) {
            pull.2 = false;
        }
    }

    /// Make the next call to `op` fail with `err`. Repeated calls queue up,
    /// one failure per call.
    pub fn fail_next(&self, op: &'static str, err: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// Before each of the next `put_file` calls on `path`, another writer
    /// replaces its content, so the caller's precondition goes stale.
    pub fn race_on(&self, path: &str, contents: &[&str]) {
        self.state.lock().unwrap().foreign_writes.insert(
            path.to_string(),
            contents.iter().map(|c| c.as_bytes().to_vec()).collect(),
        );
    }

    fn injected(&self, op: &'static str) -> Result<(), RemoteError> {
        match self
            .state
            .lock()
            .unwrap()
            .failures
            .get_mut(op)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteRepository for MemoryRepo {
    fn repository(&self) -> &RepoSlug {
        &self.slug
    }

    fn default_branch(&self) -> &str {
        &self.default_branch
    }

    async fn get_file(
        &self,
        path: &str,
        reference: &str,
    ) -> Result<Option<RemoteFile>, RemoteError> {
        self.injected("get_file")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .branches
            .get(reference)
            .and_then(|files| files.get(path))
            .map(|content| RemoteFile {
                address: hash_bytes(content),
                content: content.clone(),
            }))
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        branch: &str,
        _message: &str,
        preceding: Option<&ContentAddress>,
    ) -> Result<ContentAddress, RemoteError> {
        self.injected("put_file")?;
        let mut state = self.state.lock().unwrap();

        let foreign = state
            .foreign_writes
            .get_mut(path)
            .and_then(|queue| (!queue.is_empty()).then(|| queue.remove(0)));
        if let Some(foreign) = foreign {
            if let Some(files) = state.branches.get_mut(branch) {
                files.insert(path.to_string(), foreign);
            }
        }

        let files = state
            .branches
            .get_mut(branch)
            .ok_or_else(|| RemoteError::NotFound(format!("branch '{branch}'")))?;
        let current = files.get(path).map(|c| hash_bytes(c));
        if current.as_ref() != preceding {
            return Err(RemoteError::Conflict {
                path: path.to_string(),
            });
        }
        files.insert(path.to_string(), content.to_vec());
        state.writes += 1;
        *state.heads.entry(branch.to_string()).or_insert(0) += 1;
        Ok(hash_bytes(content))
    }

    async fn delete_file(
        &self,
        path: &str,
        branch: &str,
        _message: &str,
    ) -> Result<DeleteOutcome, RemoteError> {
        self.injected("delete_file")?;
        let mut state = self.state.lock().unwrap();
        let files = state
            .branches
            .get_mut(branch)
            .ok_or_else(|| RemoteError::NotFound(format!("branch '{branch}'")))?;
        if files.remove(path).is_none() {
            return Ok(DeleteOutcome::Absent);
        }
        state.deletes += 1;
        *state.heads.entry(branch.to_string()).or_insert(0) += 1;
        Ok(DeleteOutcome::Deleted)
    }

    async fn create_branch(
        &self,
        name: &str,
        _base: &CommitSha,
    ) -> Result<BranchOutcome, RemoteError> {
        self.injected("create_branch")?;
        let mut state = self.state.lock().unwrap();
        if state.branches.contains_key(name) {
            return Ok(BranchOutcome::AlreadyExists);
        }
        let base = state.branches.get("main").cloned().unwrap_or_default();
        state.branches.insert(name.to_string(), base);
        state.heads.insert(name.to_string(), 1);
        Ok(BranchOutcome::Created)
    }

    async fn branch_head(&self, branch: &str) -> Result<Option<CommitSha>, RemoteError> {
        self.injected("branch_head")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .heads
            .get(branch)
            .filter(|_| state.branches.contains_key(branch))
            .map(|n| CommitSha(format!("{branch}-{n}"))))
    }

    async fn latest_release(&self) -> Result<Option<TemplateRelease>, RemoteError> {
        self.injected("latest_release")?;
        Ok(self.state.lock().unwrap().release.clone())
    }

    async fn open_pull_request(
        &self,
        branch: &str,
        _title: &str,
        _body: &str,
    ) -> Result<PullRequestOutcome, RemoteError> {
        self.injected("open_pull_request")?;
        let mut state = self.state.lock().unwrap();
        if state.branches.get(branch) == state.branches.get("main") {
            return Ok(PullRequestOutcome::NoChanges);
        }
        if state.pulls.iter().any(|(b, _, open)| b == branch && *open) {
            return Ok(PullRequestOutcome::AlreadyOpen);
        }
        let url = format!(
            "https://example.test/{}/pull/{}",
            self.slug,
            state.pulls.len() + 1
        );
        state.pulls.push((branch.to_string(), url.clone(), true));
        Ok(PullRequestOutcome::Opened { url })
    }

    async fn list_tree(
        &self,
        reference: &str,
        prefix: &str,
    ) -> Result<RemoteSnapshot, RemoteError> {
        self.injected("list_tree")?;
        let state = self.state.lock().unwrap();
        let files = state
            .branches
            .get(reference)
            .ok_or_else(|| RemoteError::NotFound(format!("ref '{reference}'")))?;
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        Ok(files
            .iter()
            .filter_map(|(path, content)| {
                path.strip_prefix(&prefix)
                    .map(|rel| (rel.to_string(), hash_bytes(content)))
            })
            .collect())
    }
}
