//! REST client for one GitHub repository.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use sitesync_core::{
    CommitSha, ContentAddress, RemoteFile, RemoteSnapshot, RepoSlug, TemplateRelease,
};
use sitesync_sync::{
    BranchOutcome, DeleteOutcome, PullRequestOutcome, RemoteError, RemoteRepository,
};

use crate::error::{classify, GitHubError};
use crate::wire;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("sitesync/", env!("CARGO_PKG_VERSION"));

/// [`RemoteRepository`] backed by the GitHub REST API.
///
/// The client holds no repository state between calls.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: Url,
    repository: RepoSlug,
    default_branch: String,
}

impl GitHubClient {
    /// Build a client for `repository`.
    ///
    /// `token` is optional so public templates can be read anonymously;
    /// every write needs one.
    pub fn new(
        repository: RepoSlug,
        default_branch: impl Into<String>,
        token: Option<&str>,
        api_base: &str,
    ) -> Result<Self, GitHubError> {
        let api_base = Url::parse(api_base).map_err(|e| GitHubError::InvalidBaseUrl {
            url: api_base.to_string(),
            reason: e.to_string(),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(GitHubError::InvalidBaseUrl {
                url: api_base.to_string(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| GitHubError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_base,
            repository,
            default_branch: default_branch.into(),
        })
    }

    /// `{api_base}/repos/{owner}/{name}/{tail...}` with each segment escaped.
    fn endpoint<'a>(&self, tail: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([
                    "repos",
                    self.repository.owner.as_str(),
                    self.repository.name.as_str(),
                ])
                .extend(tail);
        }
        url
    }

    fn contents_url(&self, path: &str) -> Url {
        self.endpoint(std::iter::once("contents").chain(path.trim_matches('/').split('/')))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))
    }

    /// Fallback for files too large to be inlined in a contents response.
    async fn fetch_blob(&self, sha: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.endpoint(["git", "blobs", sha]);
        tracing::debug!(%url, "GET blob");
        let response = self.send(self.http.get(url)).await?;
        if !response.status().is_success() {
            return Err(Failure::read(response).await.into_error());
        }
        let blob: wire::Blob = decode(response).await?;
        match blob.encoding.as_deref() {
            None | Some("base64") => decode_base64(&blob.content),
            Some("utf-8") => Ok(blob.content.into_bytes()),
            Some(other) => Err(RemoteError::Decode(format!(
                "blob {sha} has unsupported encoding '{other}'"
            ))),
        }
    }
}

#[async_trait]
impl RemoteRepository for GitHubClient {
    fn repository(&self) -> &RepoSlug {
        &self.repository
    }

    fn default_branch(&self) -> &str {
        &self.default_branch
    }

    async fn get_file(
        &self,
        path: &str,
        reference: &str,
    ) -> Result<Option<RemoteFile>, RemoteError> {
        let url = self.contents_url(path);
        tracing::debug!(%url, reference, "GET contents");
        let response = self
            .send(self.http.get(url).query(&[("ref", reference)]))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(Failure::read(response).await.into_error())
            }
            _ => {}
        }

        let contents: wire::Contents = decode(response).await?;
        if let Some(kind) = contents.kind.as_deref().filter(|k| *k != "file") {
            return Err(RemoteError::Decode(format!("{path} is a {kind}, not a file")));
        }
        let inline = contents
            .content
            .as_deref()
            .filter(|_| contents.encoding.as_deref() == Some("base64"))
            .filter(|body| !body.is_empty() || contents.size == 0);
        let content = match inline {
            Some(body) => decode_base64(body)?,
            None => self.fetch_blob(&contents.sha).await?,
        };

        Ok(Some(RemoteFile {
            address: ContentAddress::from(contents.sha),
            content,
        }))
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        branch: &str,
        message: &str,
        preceding: Option<&ContentAddress>,
    ) -> Result<ContentAddress, RemoteError> {
        let url = self.contents_url(path);
        tracing::debug!(%url, branch, replaces = preceding.is_some(), "PUT contents");
        let body = wire::PutContents {
            message,
            content: STANDARD.encode(content),
            branch,
            sha: preceding.map(ContentAddress::as_str),
        };
        let response = self.send(self.http.put(url).json(&body)).await?;
        if !response.status().is_success() {
            let failure = Failure::read(response).await;
            return Err(match failure.status {
                StatusCode::CONFLICT => failure.conflict(path),
                StatusCode::UNPROCESSABLE_ENTITY if failure.mentions("sha") => {
                    failure.conflict(path)
                }
                _ => failure.into_error(),
            });
        }

        let written: wire::PutResponse = decode(response).await?;
        Ok(ContentAddress::from(written.content.sha))
    }

    async fn delete_file(
        &self,
        path: &str,
        branch: &str,
        message: &str,
    ) -> Result<DeleteOutcome, RemoteError> {
        let Some(current) = self.get_file(path, branch).await? else {
            return Ok(DeleteOutcome::Absent);
        };

        let url = self.contents_url(path);
        tracing::debug!(%url, branch, "DELETE contents");
        let body = wire::DeleteContents {
            message,
            sha: current.address.as_str(),
            branch,
        };
        let response = self.send(self.http.delete(url).json(&body)).await?;
        match response.status() {
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::Absent),
            _ => {
                let failure = Failure::read(response).await;
                Err(match failure.status {
                    StatusCode::CONFLICT => failure.conflict(path),
                    StatusCode::UNPROCESSABLE_ENTITY if failure.mentions("sha") => {
                        failure.conflict(path)
                    }
                    _ => failure.into_error(),
                })
            }
        }
    }

    async fn create_branch(
        &self,
        name: &str,
        base: &CommitSha,
    ) -> Result<BranchOutcome, RemoteError> {
        let url = self.endpoint(["git", "refs"]);
        tracing::debug!(%url, branch = name, base = %base.0, "POST ref");
        let body = wire::CreateRef {
            reference: format!("refs/heads/{name}"),
            sha: &base.0,
        };
        let response = self.send(self.http.post(url).json(&body)).await?;
        if response.status().is_success() {
            return Ok(BranchOutcome::Created);
        }
        let failure = Failure::read(response).await;
        if failure.status == StatusCode::UNPROCESSABLE_ENTITY
            && failure.mentions("Reference already exists")
        {
            return Ok(BranchOutcome::AlreadyExists);
        }
        Err(failure.into_error())
    }

    async fn branch_head(&self, branch: &str) -> Result<Option<CommitSha>, RemoteError> {
        let url = self.endpoint(["git", "ref", "heads"].into_iter().chain(branch.split('/')));
        tracing::debug!(%url, "GET ref");
        let response = self.send(self.http.get(url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let head: wire::Ref = decode(response).await?;
                Ok(Some(CommitSha(head.object.sha)))
            }
            _ => Err(Failure::read(response).await.into_error()),
        }
    }

    async fn latest_release(&self) -> Result<Option<TemplateRelease>, RemoteError> {
        let url = self.endpoint(["releases", "latest"]);
        tracing::debug!(%url, "GET latest release");
        let response = self.send(self.http.get(url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let release: wire::Release = decode(response).await?;
                Ok(Some(TemplateRelease {
                    version: release.tag_name,
                    notes_url: release.html_url,
                }))
            }
            _ => Err(Failure::read(response).await.into_error()),
        }
    }

    async fn open_pull_request(
        &self,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestOutcome, RemoteError> {
        let url = self.endpoint(["pulls"]);
        tracing::debug!(%url, head = branch, base = %self.default_branch, "POST pull request");
        let request = wire::CreatePull {
            title,
            head: branch,
            base: &self.default_branch,
            body,
        };
        let response = self.send(self.http.post(url).json(&request)).await?;
        if response.status().is_success() {
            let pull: wire::Pull = decode(response).await?;
            return Ok(PullRequestOutcome::Opened { url: pull.html_url });
        }

        let failure = Failure::read(response).await;
        if failure.status == StatusCode::UNPROCESSABLE_ENTITY {
            if failure.mentions("No commits between") {
                return Ok(PullRequestOutcome::NoChanges);
            }
            if failure.mentions("A pull request already exists") {
                return Ok(PullRequestOutcome::AlreadyOpen);
            }
        }
        Err(failure.into_error())
    }

    async fn list_tree(
        &self,
        reference: &str,
        prefix: &str,
    ) -> Result<RemoteSnapshot, RemoteError> {
        let url = self.endpoint(["git", "trees"].into_iter().chain(reference.split('/')));
        tracing::debug!(%url, prefix, "GET tree");
        let response = self
            .send(self.http.get(url).query(&[("recursive", "1")]))
            .await?;
        if !response.status().is_success() {
            return Err(Failure::read(response).await.into_error());
        }

        let tree: wire::Tree = decode(response).await?;
        if tree.truncated {
            tracing::warn!(reference, "tree listing was truncated; some files are missing");
        }
        let prefix = prefix.trim_matches('/');
        let snapshot: RemoteSnapshot = tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .filter_map(|entry| {
                let relative = if prefix.is_empty() {
                    Some(entry.path.as_str())
                } else {
                    entry
                        .path
                        .strip_prefix(prefix)
                        .and_then(|rest| rest.strip_prefix('/'))
                };
                relative.map(|rel| (rel.to_string(), ContentAddress::from(entry.sha.as_str())))
            })
            .collect();
        tracing::debug!(reference, files = snapshot.len(), "listed remote content");
        Ok(snapshot)
    }
}

/// Status, headers and described body of a failed response.
struct Failure {
    status: StatusCode,
    headers: HeaderMap,
    message: String,
}

impl Failure {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<wire::ApiError>(&body)
            .map(|err| err.describe())
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        Self {
            status,
            headers,
            message,
        }
    }

    fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle)
    }

    fn conflict(self, path: &str) -> RemoteError {
        tracing::debug!(path, status = %self.status, message = %self.message, "write precondition failed");
        RemoteError::Conflict {
            path: path.to_string(),
        }
    }

    fn into_error(self) -> RemoteError {
        tracing::warn!(status = %self.status, message = %self.message, "GitHub request failed");
        classify(self.status, &self.headers, self.message)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

/// GitHub wraps base64 payloads at 60 columns.
fn decode_base64(body: &str) -> Result<Vec<u8>, RemoteError> {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Decode(format!("invalid base64 content: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GitHubClient {
        GitHubClient::new("octo/garden".parse().unwrap(), "main", None, base).unwrap()
    }

    #[test]
    fn endpoint_escapes_segments_and_keeps_base_path() {
        let c = client("https://ghe.example.com/api/v3/");
        let url = c.contents_url("notes/a b.md");
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/garden/contents/notes/a%20b.md"
        );
    }

    #[test]
    fn rejects_non_hierarchical_base() {
        let err = GitHubClient::new("o/r".parse().unwrap(), "main", None, "mailto:x@y").unwrap_err();
        assert!(matches!(err, GitHubError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_token_with_newline() {
        let err = GitHubClient::new(
            "o/r".parse().unwrap(),
            "main",
            Some("abc\ndef"),
            "https://api.github.com",
        )
        .unwrap_err();
        assert!(matches!(err, GitHubError::InvalidToken));
    }

    #[test]
    fn base64_with_line_breaks_decodes() {
        assert_eq!(decode_base64("aGVs\nbG8g\nd29y\nbGQK\n").unwrap(), b"hello world\n");
    }
}
