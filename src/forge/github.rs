//! forge::github
//!
//! GitHub forge implementation over the git data REST API.
//!
//! # Endpoints
//!
//! | Operation       | Request                                          |
//! |-----------------|--------------------------------------------------|
//! | `create_blob`   | `POST /repos/{owner}/{repo}/git/blobs`           |
//! | `create_tree`   | `POST /repos/{owner}/{repo}/git/trees`           |
//! | `create_commit` | `POST /repos/{owner}/{repo}/git/commits`         |
//! | `update_ref`    | `PATCH /repos/{owner}/{repo}/git/refs/heads/{b}` |
//! | `archive_link`  | `GET /repos/{owner}/{repo}/{format}/{ref}` (302) |
//! | `current_user`  | `GET /user`                                      |
//!
//! # Authentication
//!
//! A [`TokenProvider`] is asked for a bearer token on every request.
//!
//! # Rate Limiting
//!
//! Rate limits surface as `ForgeError::RateLimited`. This client does not
//! retry; each request carries a timeout.
//!
//! [`TokenProvider`]: crate::auth::TokenProvider

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LOCATION};
use reqwest::{redirect, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    ArchiveFormat, CreateBlobRequest, CreateCommitRequest, CreatedCommit, Forge, ForgeError,
    ForgeUser, TreeEntryRequest, UpdateRefRequest,
};
use crate::auth::TokenProvider;
use crate::core::types::{BranchName, CommitAuthor, ObjectId, RefName};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "sitepush";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client; redirects are not followed so archive links can be read
    client: Client,
    token_provider: Arc<dyn TokenProvider>,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to keep the token provider out of logs
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GitHubForge {
    /// Create a forge against `api.github.com`.
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self, ForgeError> {
        Self::with_api_base(provider, owner, repo, DEFAULT_API_BASE, DEFAULT_TIMEOUT)
    }

    /// Create a forge against a custom API base (GitHub Enterprise, tests).
    pub fn with_api_base(
        provider: Arc<dyn TokenProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForgeError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT_VALUE)
            .timeout(timeout)
            .build()
            .map_err(|e| ForgeError::NetworkError(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_provider: provider,
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build common headers for API requests.
    async fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let token = self
            .token_provider
            .bearer_token()
            .await
            .map_err(|e| ForgeError::AuthFailed(e.to_string()))?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Send a request with auth headers and an optional JSON body.
    async fn send<B>(&self, method: Method, url: &str, body: Option<&B>) -> Result<Response, ForgeError>
    where
        B: Serialize + ?Sized + Sync,
    {
        debug!(%method, url, "github request");
        let mut request = self
            .client
            .request(method, url)
            .headers(self.headers().await?);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Send a request and decode a JSON success body.
    async fn execute<B, T>(&self, method: Method, url: &str, body: Option<&B>) -> Result<T, ForgeError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(method, url, body).await?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(Self::error_from_response(response, status).await)
        }
    }

    /// Map an error response from the API.
    async fn error_from_response(response: Response, status: StatusCode) -> ForgeError {
        // GitHub Apps report missing fine-grained permissions in this header.
        let required_permissions = response
            .headers()
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        let rate_limit_exhausted = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limit_exhausted => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(perms) = required_permissions {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Parse a sha returned by the API.
fn object_id(sha: String) -> Result<ObjectId, ForgeError> {
    ObjectId::new(sha).map_err(|e| ForgeError::ApiError {
        status: 200,
        message: format!("response carried an invalid sha: {}", e),
    })
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn create_blob(&self, request: CreateBlobRequest) -> Result<ObjectId, ForgeError> {
        let body = CreateBlobBody {
            content: &request.content,
            encoding: request.encoding.as_str(),
        };
        let created: GitHubObject = self
            .execute(Method::POST, &self.repo_url("git/blobs"), Some(&body))
            .await?;
        object_id(created.sha)
    }

    async fn create_tree(&self, entries: Vec<TreeEntryRequest>) -> Result<ObjectId, ForgeError> {
        let body = CreateTreeBody {
            tree: entries
                .iter()
                .map(|entry| TreeEntryBody {
                    path: &entry.name,
                    mode: entry.mode.as_str(),
                    kind: entry.kind.as_str(),
                    sha: entry.id.as_str(),
                })
                .collect(),
        };
        let created: GitHubObject = self
            .execute(Method::POST, &self.repo_url("git/trees"), Some(&body))
            .await?;
        object_id(created.sha)
    }

    async fn create_commit(
        &self,
        request: CreateCommitRequest,
    ) -> Result<CreatedCommit, ForgeError> {
        let body = CreateCommitBody {
            message: &request.message,
            tree: request.tree.as_str(),
            parents: Vec::new(),
            author: CommitIdentityBody::from(&request.author),
            committer: CommitIdentityBody::from(&request.committer),
        };
        let created: GitHubObject = self
            .execute(Method::POST, &self.repo_url("git/commits"), Some(&body))
            .await?;
        Ok(CreatedCommit {
            id: object_id(created.sha)?,
            url: created.url,
        })
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<(), ForgeError> {
        let refname = RefName::for_branch(&request.branch);
        let url = self.repo_url(&format!("git/refs/{}", refname.short_form()));
        let body = UpdateRefBody {
            sha: request.commit.as_str(),
            force: request.force,
        };
        let _updated: serde_json::Value = self.execute(Method::PATCH, &url, Some(&body)).await?;
        Ok(())
    }

    async fn archive_link(
        &self,
        reference: &BranchName,
        format: ArchiveFormat,
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(&format!("{}/{}", format.as_str(), reference));
        let response = self.send::<()>(Method::GET, &url, None).await?;
        let status = response.status();

        if status.is_redirection() {
            return response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
                .ok_or_else(|| ForgeError::ApiError {
                    status: status.as_u16(),
                    message: "archive redirect without a Location header".into(),
                });
        }
        if status.is_success() {
            return Err(ForgeError::ApiError {
                status: status.as_u16(),
                message: "expected a redirect to the archive download".into(),
            });
        }
        Err(Self::error_from_response(response, status).await)
    }

    async fn current_user(&self) -> Result<ForgeUser, ForgeError> {
        let url = format!("{}/user", self.api_base);
        let user: GitHubUser = self.execute::<(), _>(Method::GET, &url, None).await?;
        Ok(ForgeUser {
            login: user.login,
            name: user.name,
            email: user.email,
        })
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Serialize)]
struct CreateTreeBody<'a> {
    tree: Vec<TreeEntryBody<'a>>,
}

#[derive(Serialize)]
struct TreeEntryBody<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    sha: &'a str,
}

#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
    author: CommitIdentityBody<'a>,
    committer: CommitIdentityBody<'a>,
}

/// The API takes name, email and an ISO 8601 date; logins are not part of it.
#[derive(Serialize)]
struct CommitIdentityBody<'a> {
    name: &'a str,
    email: &'a str,
    date: String,
}

impl<'a> From<&'a CommitAuthor> for CommitIdentityBody<'a> {
    fn from(author: &'a CommitAuthor) -> Self {
        Self {
            name: &author.name,
            email: &author.email,
            date: author
                .date
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Blob, tree and commit creation all answer with at least these fields.
#[derive(Deserialize)]
struct GitHubObject {
    sha: String,
    url: String,
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}
