//! GitHub REST implementation of [`ContentApi`]
//!
//! Talks to the v3 REST API with a bearer token. Repository content is served
//! through GitHub Pages, so every [`RepositoryHandle`] carries the
//! `https://<owner>.github.io/<repo>/` base its files are reachable under.

use crate::core::error::ApiError;
use crate::core::retry::{RetryManager, RetryOptions};
use crate::core::traits::{
    ContentApi, FileWrite, Identity, NewRepository, RemoteFile, RepositoryHandle,
};
use crate::security::token_manager::{Credential, SecureTokenManager};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Upper bound for one request, connection setup included
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct OwnerResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    full_name: String,
    owner: OwnerResponse,
    #[serde(default)]
    default_branch: Option<String>,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    path: String,
    sha: String,
}

/// `GET /contents/{path}` answers with an array when the path is a directory
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentProbe {
    File(ContentResponse),
    Directory(Vec<serde_json::Value>),
}

#[derive(Debug, Deserialize)]
struct PutContentResponse {
    content: ContentResponse,
}

/// Base URL GitHub Pages serves `owner/name` from
pub fn pages_url(owner: &str, name: &str) -> String {
    let host = format!("{}.github.io", owner.to_lowercase());
    if name.to_lowercase() == host {
        format!("https://{}/", host)
    } else {
        format!("https://{}/{}/", host, name)
    }
}

impl From<RepoResponse> for RepositoryHandle {
    fn from(repo: RepoResponse) -> Self {
        let pages_url = pages_url(&repo.owner.login, &repo.name);
        Self {
            owner: repo.owner.login,
            name: repo.name,
            full_name: repo.full_name,
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
            html_url: repo.html_url,
            pages_url,
        }
    }
}

fn transport(error: reqwest::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
    headers.insert(
        "x-github-api-version",
        HeaderValue::from_static(API_VERSION),
    );

    reqwest::Client::builder()
        .user_agent(concat!("markpigeon-publisher/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .map_err(transport)
}

fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

/// reqwest-backed GitHub client
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: Url,
    credential: Credential,
    retry: RetryManager,
    token_manager: SecureTokenManager,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url.as_str())
            .field("credential", &self.credential)
            .finish()
    }
}

impl GitHubClient {
    /// Create a client for api.github.com
    pub fn new(credential: Credential) -> Result<Self, ApiError> {
        let base_url = Url::parse(DEFAULT_API_URL)
            .map_err(|e| ApiError::Transport(format!("invalid API URL: {}", e)))?;

        Ok(Self {
            http: http_client(DEFAULT_REQUEST_TIMEOUT)?,
            base_url,
            credential,
            retry: RetryManager::default(),
            token_manager: SecureTokenManager::new(),
        })
    }

    /// Replace the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ApiError> {
        self.http = http_client(timeout)?;
        Ok(self)
    }

    /// Point the client at another endpoint (GitHub Enterprise, local test server)
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ApiError> {
        self.base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Transport(format!("invalid API URL {}: {}", base_url, e)))?;
        Ok(self)
    }

    pub fn with_retry(mut self, options: RetryOptions) -> Self {
        self.retry = RetryManager::new(options);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("cannot use {} as API base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_endpoint(&self, repo: &RepositoryHandle, path: &str) -> Result<Url, ApiError> {
        let segments = ["repos", repo.owner.as_str(), repo.name.as_str(), "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ApiError> {
        tracing::debug!(method = %method, path = url.path(), "GitHub request");

        // A write whose response got lost may already have been applied
        let retry = if is_idempotent(&method) {
            self.retry.clone()
        } else {
            RetryManager::new(RetryOptions::none())
        };

        retry
            .retry(|| {
                let mut request = self
                    .http
                    .request(method.clone(), url.clone())
                    .bearer_auth(self.credential.expose());
                request = match body {
                    Some(body) => request.json(body),
                    None if method == Method::PUT => request.header(CONTENT_LENGTH, "0"),
                    None => request,
                };
                async move { request.send().await.map_err(transport) }
            })
            .await
    }

    async fn api_error(&self, response: Response) -> ApiError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .map(|body| body.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        ApiError::status(
            status.as_u16(),
            self.token_manager.mask_in_string(&message, &self.credential),
        )
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentApi for GitHubClient {
    async fn authenticated_user(&self) -> Result<Identity, ApiError> {
        let response = self.send(Method::GET, self.endpoint(["user"])?, None).await?;
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }

        let user: UserResponse = Self::decode(response).await?;
        Ok(Identity { login: user.login })
    }

    async fn get_repo(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<RepositoryHandle>, ApiError> {
        let url = self.endpoint(["repos", owner, name])?;
        let response = self.send(Method::GET, url, None).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let repo: RepoResponse = Self::decode(response).await?;
                Ok(Some(repo.into()))
            }
            _ => Err(self.api_error(response).await),
        }
    }

    async fn create_repo(&self, repo: NewRepository) -> Result<RepositoryHandle, ApiError> {
        let body = json!({
            "name": repo.name,
            "description": repo.description,
            "private": repo.private,
            "auto_init": repo.auto_init,
        });

        let url = self.endpoint(["user", "repos"])?;
        let response = self.send(Method::POST, url, Some(&body)).await?;
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }

        let created: RepoResponse = Self::decode(response).await?;
        Ok(created.into())
    }

    async fn enable_pages(&self, repo: &RepositoryHandle) -> Result<(), ApiError> {
        let body = json!({
            "source": { "branch": repo.default_branch, "path": "/" },
        });

        let url = self.endpoint(["repos", repo.owner.as_str(), repo.name.as_str(), "pages"])?;
        let response = self.send(Method::POST, url, Some(&body)).await?;

        match response.status() {
            // 409: a Pages site already exists
            StatusCode::CONFLICT => Ok(()),
            status if status.is_success() => Ok(()),
            _ => Err(self.api_error(response).await),
        }
    }

    async fn get_file(
        &self,
        repo: &RepositoryHandle,
        path: &str,
    ) -> Result<Option<RemoteFile>, ApiError> {
        let mut url = self.contents_endpoint(repo, path)?;
        url.query_pairs_mut().append_pair("ref", &repo.default_branch);

        let response = self.send(Method::GET, url, None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => match Self::decode::<ContentProbe>(response).await? {
                ContentProbe::File(file) => Ok(Some(RemoteFile {
                    path: file.path,
                    sha: file.sha,
                })),
                ContentProbe::Directory(_) => {
                    Err(ApiError::Decode(format!("{} is a directory", path)))
                }
            },
            _ => Err(self.api_error(response).await),
        }
    }

    async fn put_file(
        &self,
        repo: &RepositoryHandle,
        write: FileWrite,
    ) -> Result<RemoteFile, ApiError> {
        let mut body = json!({
            "message": write.message,
            "content": BASE64.encode(&write.content),
            "branch": repo.default_branch,
        });
        if let Some(sha) = &write.sha {
            body["sha"] = json!(sha);
        }

        let url = self.contents_endpoint(repo, &write.path)?;
        let response = self.send(Method::PUT, url, Some(&body)).await?;
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }

        let written: PutContentResponse = Self::decode(response).await?;
        Ok(RemoteFile {
            path: written.content.path,
            sha: written.content.sha,
        })
    }

    async fn is_starred(&self, owner: &str, name: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(["user", "starred", owner, name])?;
        let response = self.send(Method::GET, url, None).await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(self.api_error(response).await),
        }
    }

    async fn star(&self, owner: &str, name: &str) -> Result<(), ApiError> {
        let url = self.endpoint(["user", "starred", owner, name])?;
        let response = self.send(Method::PUT, url, None).await?;
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }
        Ok(())
    }
}
