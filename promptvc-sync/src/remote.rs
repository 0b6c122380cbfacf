//! Remote hosting service client.
//!
//! `RemoteService` is the seam the sync adapter talks to. `HttpRemote` speaks
//! the service's JSON API:
//! - `POST {token_url}`: authorization code -> access token
//! - `GET/POST {api}/repos`: list / create repositories
//! - `GET/POST {api}/repos/{id}/branches/{branch}/commits`: read / create commits

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promptvc_core::{AccessToken, Commit, RemoteRepoRef};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifier the remote assigned to a commit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteCommitId(String);

impl RemoteCommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteCommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Commit as stored by the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommit {
    pub id: RemoteCommitId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

/// Body of a commit creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommitDraft {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl From<&Commit> for RemoteCommitDraft {
    fn from(commit: &Commit) -> Self {
        Self {
            message: commit.message().to_string(),
            timestamp: commit.timestamp(),
            content: commit.snapshot().as_str().to_string(),
        }
    }
}

/// Remote hosting service interface
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Exchange a one-time authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, RemoteError>;

    async fn list_repositories(&self, token: &AccessToken) -> Result<Vec<RemoteRepoRef>, RemoteError>;

    async fn create_repository(
        &self,
        token: &AccessToken,
        name: &str,
        private: bool,
    ) -> Result<RemoteRepoRef, RemoteError>;

    /// Commits on `branch`, oldest first; only those after `since` when given
    async fn list_commits(
        &self,
        token: &AccessToken,
        repo: &RemoteRepoRef,
        branch: &str,
        since: Option<&RemoteCommitId>,
    ) -> Result<Vec<RemoteCommit>, RemoteError>;

    /// Append one commit to `branch`
    async fn create_commit(
        &self,
        token: &AccessToken,
        repo: &RemoteRepoRef,
        branch: &str,
        commit: &RemoteCommitDraft,
    ) -> Result<RemoteCommit, RemoteError>;
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    private: bool,
}

/// HTTP JSON implementation of `RemoteService`
pub struct HttpRemote {
    config: RemoteConfig,
    http: reqwest::Client,
}

impl HttpRemote {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// `{api_base_url}/<segments...>`, each segment percent-encoded
    fn api_url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.config.api_base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn commits_url(&self, repo: &RemoteRepoRef, branch: &str) -> Result<Url, RemoteError> {
        self.api_url(&["repos", &repo.id, "branches", branch, "commits"])
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized(status.as_u16()));
        }
        let body = resp.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, RemoteError> {
        debug!("POST {}", self.config.token_url);
        let body = TokenRequest {
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.as_deref(),
            code,
            redirect_uri: self.config.redirect_uri.as_deref(),
        };
        let resp = self
            .http
            .post(&self.config.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let token: TokenResponse = resp.json().await?;
        if let Some(error) = token.error {
            return Err(RemoteError::Rejected(token.error_description.unwrap_or(error)));
        }
        token
            .access_token
            .filter(|t| !t.is_empty())
            .map(AccessToken::new)
            .ok_or_else(|| RemoteError::Decode("token response has no access_token".to_string()))
    }

    async fn list_repositories(&self, token: &AccessToken) -> Result<Vec<RemoteRepoRef>, RemoteError> {
        let url = self.api_url(&["repos"])?;
        debug!("GET {}", url);
        let resp = self
            .send(self.http.get(url).bearer_auth(token.secret()))
            .await?;
        Ok(resp.json().await?)
    }

    async fn create_repository(
        &self,
        token: &AccessToken,
        name: &str,
        private: bool,
    ) -> Result<RemoteRepoRef, RemoteError> {
        let url = self.api_url(&["repos"])?;
        debug!("POST {}", url);
        let resp = self
            .send(
                self.http
                    .post(url)
                    .bearer_auth(token.secret())
                    .json(&CreateRepoRequest { name, private }),
            )
            .await?;
        Ok(resp.json().await?)
    }

    async fn list_commits(
        &self,
        token: &AccessToken,
        repo: &RemoteRepoRef,
        branch: &str,
        since: Option<&RemoteCommitId>,
    ) -> Result<Vec<RemoteCommit>, RemoteError> {
        let mut url = self.commits_url(repo, branch)?;
        if let Some(since) = since {
            url.query_pairs_mut().append_pair("since", since.as_str());
        }
        debug!("GET {}", url);
        let resp = self
            .send(self.http.get(url).bearer_auth(token.secret()))
            .await?;
        Ok(resp.json().await?)
    }

    async fn create_commit(
        &self,
        token: &AccessToken,
        repo: &RemoteRepoRef,
        branch: &str,
        commit: &RemoteCommitDraft,
    ) -> Result<RemoteCommit, RemoteError> {
        let url = self.commits_url(repo, branch)?;
        debug!("POST {}", url);
        let resp = self
            .send(self.http.post(url).bearer_auth(token.secret()).json(commit))
            .await?;
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptvc_core::Snapshot;

    fn remote(base: &str) -> HttpRemote {
        HttpRemote::new(RemoteConfig::for_base_url(base)).unwrap()
    }

    #[test]
    fn test_commits_url_encodes_segments() {
        let remote = remote("http://localhost:8080/api/");
        let repo = RemoteRepoRef::new("me/prompts", "prompts");
        let url = remote.commits_url(&repo, "my branch").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/repos/me%2Fprompts/branches/my%20branch/commits"
        );
    }

    #[test]
    fn test_api_url_without_path() {
        let remote = remote("http://localhost:8080");
        assert_eq!(
            remote.api_url(&["repos"]).unwrap().as_str(),
            "http://localhost:8080/repos"
        );
    }

    #[test]
    fn test_draft_from_commit() {
        let commit = Commit::new("Shorter intro".into(), Snapshot::new("Be brief."));
        let draft = RemoteCommitDraft::from(&commit);
        assert_eq!(draft.message, "Shorter intro");
        assert_eq!(draft.content, "Be brief.");
        assert_eq!(draft.timestamp, commit.timestamp());
    }
}
