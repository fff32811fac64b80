//! Construction errors and HTTP failure classification.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use sitesync_sync::RemoteError;

/// Errors building a [`crate::GitHubClient`].
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("API token contains characters not allowed in a header")]
    InvalidToken,

    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Map a non-success response onto the shared remote error taxonomy.
///
/// Callers handle the operation-specific codes (404 as absence, 409/422 as
/// conflicts or benign outcomes) before falling back to this.
pub(crate) fn classify(status: StatusCode, headers: &HeaderMap, message: String) -> RemoteError {
    match status.as_u16() {
        401 => RemoteError::Unauthorized(message),
        403 | 429 if is_rate_limited(status, headers) => RemoteError::RateLimited(message),
        403 => RemoteError::Forbidden(message),
        404 => RemoteError::NotFound(message),
        code => RemoteError::Unexpected {
            status: code,
            message,
        },
    }
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS || headers.contains_key("retry-after") {
        return true;
    }
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}
