//! GitHub contents API replication
//!
//! Each list/log file maps to one blob in the configured repository,
//! addressed by base file name. The blob's content SHA is the version
//! token: publishing with a stale SHA fails as a conflict instead of
//! silently overwriting a concurrent edit.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::backend::{Remote, RemoteError};

const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("td-cli/", env!("CARGO_PKG_VERSION"));

/// Replication into a GitHub repository via the contents API.
pub struct GithubRemote {
    client: Client,
    api_url: String,
    repo: String,
    branch: String,
    token: String,
}

/// Subset of the contents API metadata we rely on.
#[derive(Debug, Deserialize)]
struct ContentMeta {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PutContent<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GithubRemote {
    /// Creates a backend for `owner/name` using the given token, reading
    /// and writing `branch`.
    pub fn new(repo: impl Into<String>, token: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
        }
    }

    /// Points the backend at a different API host (GitHub Enterprise).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn contents_url(&self, name: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_url, self.repo, name)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }

    /// Reads the blob's metadata. `Ok(None)` when the blob does not exist
    /// on the branch yet.
    fn get_meta(&self, name: &str) -> Result<Option<ContentMeta>, RemoteError> {
        let url = self.contents_url(name);
        let response = self
            .request(self.client.get(&url))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .map_err(|source| RemoteError::Transport {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let meta = response.json().map_err(|e| RemoteError::Protocol {
                    url,
                    detail: e.to_string(),
                })?;
                Ok(Some(meta))
            }
            status => Err(RemoteError::Api {
                status: status.as_u16(),
                url,
                body: response.text().unwrap_or_default(),
            }),
        }
    }
}

/// Decodes the contents API's base64 payload, which arrives chunked with
/// embedded newlines.
fn decode_content(url: &str, encoded: &str) -> Result<String, RemoteError> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64.decode(cleaned).map_err(|e| RemoteError::Protocol {
        url: url.to_string(),
        detail: format!("invalid base64 content: {e}"),
    })?;
    String::from_utf8(bytes).map_err(|e| RemoteError::Protocol {
        url: url.to_string(),
        detail: format!("content is not UTF-8: {e}"),
    })
}

impl Remote for GithubRemote {
    fn name(&self) -> &'static str {
        "github"
    }

    fn fetch(&self, name: &str) -> Result<Option<String>, RemoteError> {
        let url = self.contents_url(name);
        match self.get_meta(name)? {
            Some(meta) => Ok(Some(decode_content(&url, &meta.content)?)),
            None => Ok(None),
        }
    }

    fn publish(&self, name: &str, content: &str, message: &str) -> Result<(), RemoteError> {
        // The current SHA guards against blind overwrites; a blob that
        // does not exist yet is created without one.
        let sha = self.get_meta(name)?.map(|meta| meta.sha);

        let url = self.contents_url(name);
        let body = PutContent {
            message,
            content: BASE64.encode(content),
            branch: &self.branch,
            sha: sha.as_deref(),
        };

        let response = self
            .request(self.client.put(&url))
            .json(&body)
            .send()
            .map_err(|source| RemoteError::Transport {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => Err(RemoteError::Conflict {
                name: name.to_string(),
            }),
            status => Err(RemoteError::Api {
                status: status.as_u16(),
                url,
                body: response.text().unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_url_addresses_blob_by_name() {
        let remote = GithubRemote::new("alice/todo", "token", "main");
        assert_eq!(
            remote.contents_url("todo_work.md"),
            "https://api.github.com/repos/alice/todo/contents/todo_work.md"
        );
    }

    #[test]
    fn api_url_override_is_used() {
        let remote =
            GithubRemote::new("alice/todo", "token", "main").with_api_url("http://localhost:9999");
        assert!(remote
            .contents_url("todo.log")
            .starts_with("http://localhost:9999/repos/"));
    }

    #[test]
    fn put_payload_omits_sha_for_new_blobs() {
        let body = PutContent {
            message: "Add new todo list: todo_work.md",
            content: BASE64.encode("1:buy milk\n"),
            branch: "main",
            sha: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());
        assert_eq!(json["branch"], "main");
    }

    #[test]
    fn put_payload_carries_sha_for_updates() {
        let body = PutContent {
            message: "Add task: buy milk",
            content: BASE64.encode("1:buy milk\n"),
            branch: "main",
            sha: Some("abc123"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sha"], "abc123");
    }

    #[test]
    fn decode_content_strips_embedded_newlines() {
        // The API wraps base64 at 60 columns.
        let encoded = BASE64.encode("1:buy milk\n2:call bank\n");
        let chunked = format!("{}\n{}", &encoded[..8], &encoded[8..]);
        assert_eq!(
            decode_content("http://x", &chunked).unwrap(),
            "1:buy milk\n2:call bank\n"
        );
    }

    #[test]
    fn decode_content_rejects_garbage() {
        assert!(matches!(
            decode_content("http://x", "!!not base64!!"),
            Err(RemoteError::Protocol { .. })
        ));
    }
}
