//! GitHub Publisher - main orchestrator for document publishing
//!
//! Manages the complete publishing workflow:
//! - Credential validation against the remote
//! - Shelf repository lookup or creation
//! - Entry document and asset uploads, one at a time
//! - Progress reporting and aggregation into a [`PublishResult`]
//!
//! Setup faults end the attempt before anything is uploaded. Upload faults are
//! recorded and the sequence carries on; only the entry document decides
//! whether the publish as a whole succeeded.

use crate::core::config::DEFAULT_REPO_NAME;
use crate::core::error::{ApiError, PublishError};
use crate::core::remote_path::entry_remote_path;
use crate::core::traits::{
    ContentApi, Identity, NewRepository, ProgressCallback, PublishResult, RepositoryHandle,
    UploadTarget,
};
use crate::orchestration::assets::{AssetWalker, SkippedAsset};
use crate::orchestration::uploader::FileUploader;
use crate::remote::github::GitHubClient;
use crate::security::token_manager::Credential;
use std::fmt;
use std::path::Path;

/// Owner of the project repository [`GitHubPublisher::star_repo`] stars
pub const STAR_OWNER: &str = "markpigeon";

/// Name of the project repository [`GitHubPublisher::star_repo`] stars
pub const STAR_REPO: &str = "markpigeon";

const REPO_DESCRIPTION: &str = "Documents published with MarkPigeon";

/// Publishes documents into a single shelf repository
///
/// The credential and repository name are fixed at construction; nothing else
/// is remembered between [`publish`](Self::publish) calls. Calls on one
/// instance must not overlap.
///
/// # Examples
///
/// ```no_run
/// use markpigeon_publisher::orchestration::GitHubPublisher;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), markpigeon_publisher::core::ApiError> {
/// let publisher = GitHubPublisher::new("ghp_xxx", "markpigeon-shelf")?
///     .with_progress_callback(Arc::new(|current, total, message: &str| {
///         println!("[{}/{}] {}", current, total, message);
///     }));
///
/// let result = publisher
///     .publish(Path::new("out/report.html"), Some(Path::new("out/report_assets")))
///     .await;
///
/// if result.success {
///     println!("Published to {}", result.url);
/// }
/// # Ok(())
/// # }
/// ```
pub struct GitHubPublisher<A = GitHubClient> {
    api: A,
    token: Credential,
    repo_name: String,
    progress_callback: Option<ProgressCallback>,
}

impl<A> fmt::Debug for GitHubPublisher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubPublisher")
            .field("token", &self.token)
            .field("repo_name", &self.repo_name)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl GitHubPublisher<GitHubClient> {
    /// Create a publisher talking to api.github.com
    pub fn new(
        token: impl Into<Credential>,
        repo_name: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let token = token.into();
        let api = GitHubClient::new(token.clone())?;
        Ok(Self::with_api(api, token, repo_name))
    }

    /// Create a publisher for the default shelf repository
    pub fn with_default_repo(token: impl Into<Credential>) -> Result<Self, ApiError> {
        Self::new(token, DEFAULT_REPO_NAME)
    }
}

impl<A: ContentApi> GitHubPublisher<A> {
    /// Create a publisher on top of any [`ContentApi`] implementation
    pub fn with_api(api: A, token: Credential, repo_name: impl Into<String>) -> Self {
        Self {
            api,
            token,
            repo_name: repo_name.into(),
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn token(&self) -> &Credential {
        &self.token
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    pub fn progress_callback(&self) -> Option<&ProgressCallback> {
        self.progress_callback.as_ref()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn report_progress(&self, current: usize, total: usize, message: &str) {
        tracing::info!(current, total, "{}", message);
        if let Some(callback) = &self.progress_callback {
            callback(current, total, message);
        }
    }

    async fn connect(&self) -> Result<Identity, PublishError> {
        self.api.authenticated_user().await.map_err(|e| {
            tracing::warn!(token = %self.token.masked(), error = %e, "Authentication failed");
            PublishError::Connection {
                message: e.to_string(),
            }
        })
    }

    /// Validate the credential
    ///
    /// Returns `(true, login)` on success and `(false, reason)` otherwise, the
    /// reason being the remote's own error text (e.g. "Bad credentials").
    pub async fn check_connection(&self) -> (bool, String) {
        match self.connect().await {
            Ok(identity) => {
                tracing::info!(login = %identity.login, "Connected to GitHub");
                (true, identity.login)
            }
            Err(PublishError::Connection { message }) => (false, message),
            Err(other) => (false, other.to_string()),
        }
    }

    /// Find the shelf repository of the authenticated user, creating it if needed
    pub async fn get_or_create_repo(&self) -> Result<RepositoryHandle, PublishError> {
        let identity = self.connect().await?;
        self.resolve_repo(&identity).await
    }

    async fn resolve_repo(&self, identity: &Identity) -> Result<RepositoryHandle, PublishError> {
        let full_name = format!("{}/{}", identity.login, self.repo_name);

        match self.api.get_repo(&identity.login, &self.repo_name).await {
            Ok(Some(repo)) => {
                tracing::info!(repo = %repo.full_name, "Using existing repository");
                return Ok(repo);
            }
            Ok(None) => {}
            Err(e) => {
                return Err(PublishError::RepositoryLookup {
                    repo: full_name,
                    message: e.to_string(),
                });
            }
        }

        tracing::info!(repo = %full_name, "Repository not found, creating it");
        let repo = self
            .api
            .create_repo(NewRepository {
                name: self.repo_name.clone(),
                description: REPO_DESCRIPTION.to_string(),
                private: false,
                auto_init: true,
            })
            .await
            .map_err(|e| PublishError::RepositoryCreate {
                repo: full_name,
                message: e.to_string(),
            })?;

        if let Err(e) = self.api.enable_pages(&repo).await {
            tracing::warn!(
                repo = %repo.full_name,
                error = %e,
                "Could not enable GitHub Pages; enable it in the repository settings"
            );
        }

        Ok(repo)
    }

    /// Upload one file, deciding between create and update on the remote
    pub async fn upload_file(
        &self,
        repo: &RepositoryHandle,
        local_path: &Path,
        remote_path: &str,
        commit_message: &str,
    ) -> bool {
        FileUploader::new(&self.api)
            .upload_file(repo, local_path, remote_path, commit_message)
            .await
    }

    /// Star the MarkPigeon project repository
    ///
    /// Already being starred counts as success.
    pub async fn star_repo(&self) -> (bool, String) {
        let full_name = format!("{}/{}", STAR_OWNER, STAR_REPO);

        match self.api.is_starred(STAR_OWNER, STAR_REPO).await {
            Ok(true) => return (true, format!("Already starred {}", full_name)),
            Ok(false) => {}
            Err(e) => return (false, e.to_string()),
        }

        match self.api.star(STAR_OWNER, STAR_REPO).await {
            Ok(()) => {
                tracing::info!(repo = %full_name, "Starred repository");
                (true, format!("Starred {}, thank you!", full_name))
            }
            Err(e) => (false, e.to_string()),
        }
    }

    /// Publish `html_file` and the contents of `assets_dir`
    ///
    /// Never fails; every problem ends up in the returned [`PublishResult`].
    pub async fn publish(&self, html_file: &Path, assets_dir: Option<&Path>) -> PublishResult {
        let entry_path = match tokio::fs::metadata(html_file).await {
            Ok(meta) if meta.is_file() => entry_remote_path(html_file),
            _ => None,
        };
        let Some(entry_path) = entry_path else {
            let error = PublishError::InvalidInput {
                path: html_file.to_path_buf(),
                message: "not an existing file".to_string(),
            };
            return PublishResult::failed(error.to_string());
        };

        let identity = match self.connect().await {
            Ok(identity) => identity,
            Err(PublishError::Connection { message }) => return PublishResult::failed(message),
            Err(other) => return PublishResult::failed(other.to_string()),
        };

        let repo = match self.resolve_repo(&identity).await {
            Ok(repo) => repo,
            Err(e) => return PublishResult::failed(e.to_string()),
        };

        let mut result = PublishResult::default();

        let mut targets: Vec<Result<UploadTarget, SkippedAsset>> = vec![Ok(UploadTarget {
            local_path: std::path::absolute(html_file).unwrap_or_else(|_| html_file.to_path_buf()),
            remote_path: entry_path.clone(),
        })];
        if let Some(assets_dir) = assets_dir {
            if assets_dir.is_dir() {
                targets.extend(AssetWalker::new(assets_dir).walk());
            } else {
                result
                    .errors
                    .push(format!("Assets directory not found: {}", assets_dir.display()));
            }
        }

        let total = targets.len();
        tracing::info!(repo = %repo.full_name, total, "Starting upload");
        self.report_progress(0, total, "Preparing upload");

        let uploader = FileUploader::new(&self.api);
        let mut entry_uploaded = false;

        for (index, target) in targets.iter().enumerate() {
            let target = match target {
                Ok(target) => target,
                Err(skipped) => {
                    result.errors.push(skipped.to_string());
                    self.report_progress(
                        index + 1,
                        total,
                        &format!("Skipped {}", skipped.path.display()),
                    );
                    continue;
                }
            };

            let commit_message = format!("Publish {} via MarkPigeon", target.remote_path);
            let uploaded = uploader
                .upload_file(&repo, &target.local_path, &target.remote_path, &commit_message)
                .await;

            if uploaded {
                if index == 0 {
                    entry_uploaded = true;
                }
                result.files_uploaded.push(target.remote_path.clone());
                self.report_progress(index + 1, total, &format!("Uploaded {}", target.remote_path));
            } else {
                result
                    .errors
                    .push(format!("Failed to upload {}", target.remote_path));
                self.report_progress(index + 1, total, &format!("Failed {}", target.remote_path));
            }
        }

        result.success = entry_uploaded;
        if result.success {
            result.url = repo.content_url(&entry_path);
            result.message = if result.errors.is_empty() {
                format!("Published {} file(s)", result.files_uploaded.len())
            } else {
                format!(
                    "Published {} file(s) with {} warning(s)",
                    result.files_uploaded.len(),
                    result.errors.len()
                )
            };
            tracing::info!(url = %result.url, warnings = result.errors.len(), "Publish finished");
        } else {
            result.message = format!("Failed to upload {}", entry_path);
            tracing::warn!(errors = result.errors.len(), "Publish failed");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{MockContentApi, RemoteFile};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn shelf() -> RepositoryHandle {
        RepositoryHandle {
            owner: "testuser".to_string(),
            name: "test-repo".to_string(),
            full_name: "testuser/test-repo".to_string(),
            default_branch: "main".to_string(),
            html_url: "https://github.com/testuser/test-repo".to_string(),
            pages_url: "https://testuser.github.io/test-repo/".to_string(),
        }
    }

    fn publisher(api: MockContentApi) -> GitHubPublisher<MockContentApi> {
        GitHubPublisher::with_api(api, Credential::new("fake_token"), "test-repo")
    }

    fn expect_login(api: &mut MockContentApi) {
        api.expect_authenticated_user().returning(|| {
            Ok(Identity {
                login: "testuser".to_string(),
            })
        });
    }

    #[test]
    fn test_init() {
        let publisher = GitHubPublisher::new("fake_token", "test-repo").unwrap();

        assert_eq!(publisher.token().expose(), "fake_token");
        assert_eq!(publisher.repo_name(), "test-repo");
        assert!(publisher.progress_callback().is_none());
    }

    #[test]
    fn test_default_repo_name() {
        let publisher = GitHubPublisher::with_default_repo("fake_token").unwrap();
        assert_eq!(publisher.repo_name(), "markpigeon-shelf");
    }

    #[test]
    fn test_init_with_progress_callback() {
        let callback: ProgressCallback = Arc::new(|_, _, _: &str| {});
        let publisher = publisher(MockContentApi::new()).with_progress_callback(callback.clone());

        assert!(Arc::ptr_eq(publisher.progress_callback().unwrap(), &callback));
    }

    #[test]
    fn test_debug_masks_token() {
        let publisher = GitHubPublisher::with_api(
            MockContentApi::new(),
            Credential::new("ghp_super_secret_value"),
            "test-repo",
        );

        let debug = format!("{:?}", publisher);
        assert!(!debug.contains("ghp_super_secret_value"));
        assert!(debug.contains("test-repo"));
    }

    #[tokio::test]
    async fn test_check_connection_success() {
        let mut api = MockContentApi::new();
        expect_login(&mut api);

        let (success, message) = publisher(api).check_connection().await;

        assert!(success);
        assert_eq!(message, "testuser");
    }

    #[tokio::test]
    async fn test_check_connection_failure() {
        let mut api = MockContentApi::new();
        api.expect_authenticated_user()
            .returning(|| Err(ApiError::status(401, "Bad credentials")));

        let (success, message) = publisher(api).check_connection().await;

        assert!(!success);
        assert!(message.contains("Bad credentials"));
    }

    #[tokio::test]
    async fn test_check_connection_network_failure() {
        let mut api = MockContentApi::new();
        api.expect_authenticated_user()
            .returning(|| Err(ApiError::Transport("dns error".to_string())));

        let (success, message) = publisher(api).check_connection().await;

        assert!(!success);
        assert!(message.contains("dns error"));
    }

    #[tokio::test]
    async fn test_get_existing_repo_is_not_recreated() {
        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo()
            .withf(|owner, name| owner == "testuser" && name == "test-repo")
            .times(1)
            .returning(|_, _| Ok(Some(shelf())));
        api.expect_create_repo().times(0);
        api.expect_enable_pages().times(0);

        let repo = publisher(api).get_or_create_repo().await.unwrap();
        assert_eq!(repo, shelf());
    }

    #[tokio::test]
    async fn test_missing_repo_is_created_public() {
        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo().returning(|_, _| Ok(None));
        api.expect_create_repo()
            .withf(|repo| repo.name == "test-repo" && !repo.private && repo.auto_init)
            .times(1)
            .returning(|_| Ok(shelf()));
        api.expect_enable_pages().times(1).returning(|_| Ok(()));

        let repo = publisher(api).get_or_create_repo().await.unwrap();
        assert_eq!(repo.full_name, "testuser/test-repo");
    }

    #[tokio::test]
    async fn test_pages_failure_does_not_fail_resolution() {
        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo().returning(|_, _| Ok(None));
        api.expect_create_repo().returning(|_| Ok(shelf()));
        api.expect_enable_pages()
            .returning(|_| Err(ApiError::status(403, "Resource not accessible")));

        assert!(publisher(api).get_or_create_repo().await.is_ok());
    }

    #[tokio::test]
    async fn test_create_failure_carries_cause() {
        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo().returning(|_, _| Ok(None));
        api.expect_create_repo().returning(|_| {
            Err(ApiError::status(
                422,
                "Repository creation failed: name already exists on this account",
            ))
        });

        let error = publisher(api).get_or_create_repo().await.unwrap_err();

        assert_eq!(error.code(), "REPOSITORY_CREATE_FAILED");
        assert!(error.to_string().contains("name already exists"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_treated_as_missing() {
        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo()
            .returning(|_, _| Err(ApiError::status(500, "Server Error")));
        api.expect_create_repo().times(0);

        let error = publisher(api).get_or_create_repo().await.unwrap_err();
        assert_eq!(error.code(), "REPOSITORY_LOOKUP_FAILED");
    }

    #[tokio::test]
    async fn test_star_repo_when_not_starred() {
        let mut api = MockContentApi::new();
        api.expect_is_starred()
            .withf(|owner, name| owner == STAR_OWNER && name == STAR_REPO)
            .returning(|_, _| Ok(false));
        api.expect_star().times(1).returning(|_, _| Ok(()));

        let (success, message) = publisher(api).star_repo().await;

        assert!(success);
        assert!(message.contains("Starred"));
    }

    #[tokio::test]
    async fn test_star_repo_already_starred() {
        let mut api = MockContentApi::new();
        api.expect_is_starred().returning(|_, _| Ok(true));
        api.expect_star().times(0);

        let (success, message) = publisher(api).star_repo().await;

        assert!(success);
        assert!(message.to_lowercase().contains("already"));
    }

    #[tokio::test]
    async fn test_star_repo_failure() {
        let mut api = MockContentApi::new();
        api.expect_is_starred().returning(|_, _| Ok(false));
        api.expect_star()
            .returning(|_, _| Err(ApiError::Transport("connection refused".to_string())));

        let (success, message) = publisher(api).star_repo().await;

        assert!(!success);
        assert!(message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_publish_with_bad_credentials_uploads_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let html = temp_dir.path().join("doc.html");
        fs::write(&html, "<html></html>").unwrap();

        let mut api = MockContentApi::new();
        api.expect_authenticated_user()
            .returning(|| Err(ApiError::status(401, "Bad credentials")));
        api.expect_get_repo().times(0);
        api.expect_get_file().times(0);
        api.expect_put_file().times(0);

        let result = publisher(api).publish(&html, None).await;

        assert!(!result.success);
        assert!(result.files_uploaded.is_empty());
        assert!(result.errors.is_empty());
        assert!(result.message.contains("Bad credentials"));
    }

    #[tokio::test]
    async fn test_publish_missing_html_fails_before_network() {
        let temp_dir = TempDir::new().unwrap();

        let mut api = MockContentApi::new();
        api.expect_authenticated_user().times(0);

        let result = publisher(api)
            .publish(&temp_dir.path().join("missing.html"), None)
            .await;

        assert!(!result.success);
        assert!(result.message.contains("missing.html"));
        assert!(result.files_uploaded.is_empty());
    }

    #[tokio::test]
    async fn test_publish_repo_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let html = temp_dir.path().join("doc.html");
        fs::write(&html, "<html></html>").unwrap();

        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo().returning(|_, _| Ok(None));
        api.expect_create_repo()
            .returning(|_| Err(ApiError::status(403, "Resource not accessible by integration")));
        api.expect_put_file().times(0);

        let result = publisher(api).publish(&html, None).await;

        assert!(!result.success);
        assert!(result.message.contains("Resource not accessible"));
        assert!(result.files_uploaded.is_empty());
    }

    #[tokio::test]
    async fn test_publish_reports_progress_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let html = temp_dir.path().join("doc.html");
        fs::write(&html, "<html></html>").unwrap();
        let assets = temp_dir.path().join("doc_assets");
        fs::create_dir(&assets).unwrap();
        fs::write(assets.join("a.png"), "a").unwrap();
        fs::write(assets.join("b.png"), "b").unwrap();

        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo().returning(|_, _| Ok(Some(shelf())));
        api.expect_get_file().returning(|_, _| Ok(None));
        api.expect_put_file().times(3).returning(|_, write| {
            Ok(RemoteFile {
                path: write.path,
                sha: "sha".to_string(),
            })
        });

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let publisher = publisher(api).with_progress_callback(Arc::new(
            move |current: usize, total: usize, message: &str| {
                sink.lock().unwrap().push((current, total, message.to_string()));
            },
        ));

        let result = publisher.publish(&html, Some(&assets)).await;

        assert!(result.success);
        assert_eq!(result.url, "https://testuser.github.io/test-repo/doc.html");
        assert_eq!(
            result.files_uploaded,
            vec!["doc.html", "doc_assets/a.png", "doc_assets/b.png"]
        );
        assert!(result.errors.is_empty());
        assert_eq!(result.message, "Published 3 file(s)");

        let events = events.lock().unwrap();
        let counts: Vec<(usize, usize)> = events.iter().map(|(c, t, _)| (*c, *t)).collect();
        assert_eq!(counts, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
        assert_eq!(events[1].2, "Uploaded doc.html");
    }

    #[tokio::test]
    async fn test_asset_failure_is_a_warning() {
        let temp_dir = TempDir::new().unwrap();
        let html = temp_dir.path().join("doc.html");
        fs::write(&html, "<html></html>").unwrap();
        let assets = temp_dir.path().join("doc_assets");
        fs::create_dir(&assets).unwrap();
        fs::write(assets.join("huge.png"), "x").unwrap();
        fs::write(assets.join("ok.png"), "y").unwrap();

        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo().returning(|_, _| Ok(Some(shelf())));
        api.expect_get_file().returning(|_, _| Ok(None));
        api.expect_put_file().returning(|_, write| {
            if write.path.ends_with("huge.png") {
                Err(ApiError::status(422, "file too large"))
            } else {
                Ok(RemoteFile {
                    path: write.path,
                    sha: "sha".to_string(),
                })
            }
        });

        let result = publisher(api).publish(&html, Some(&assets)).await;

        assert!(result.success);
        assert!(result.has_warnings());
        assert_eq!(result.files_uploaded, vec!["doc.html", "doc_assets/ok.png"]);
        assert_eq!(result.errors, vec!["Failed to upload doc_assets/huge.png"]);
        assert!(!result.url.is_empty());
        assert!(result.message.contains("1 warning"));
    }

    #[tokio::test]
    async fn test_entry_failure_fails_publish() {
        let temp_dir = TempDir::new().unwrap();
        let html = temp_dir.path().join("doc.html");
        fs::write(&html, "<html></html>").unwrap();
        let assets = temp_dir.path().join("doc_assets");
        fs::create_dir(&assets).unwrap();
        fs::write(assets.join("a.png"), "a").unwrap();

        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo().returning(|_, _| Ok(Some(shelf())));
        api.expect_get_file().returning(|_, _| Ok(None));
        api.expect_put_file().returning(|_, write| {
            if write.path == "doc.html" {
                Err(ApiError::status(409, "is at abc but expected def"))
            } else {
                Ok(RemoteFile {
                    path: write.path,
                    sha: "sha".to_string(),
                })
            }
        });

        let result = publisher(api).publish(&html, Some(&assets)).await;

        assert!(!result.success);
        assert!(result.url.is_empty());
        assert_eq!(result.files_uploaded, vec!["doc_assets/a.png"]);
        assert_eq!(result.errors, vec!["Failed to upload doc.html"]);
        assert_eq!(result.message, "Failed to upload doc.html");
    }

    #[tokio::test]
    async fn test_missing_assets_dir_is_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let html = temp_dir.path().join("doc.html");
        fs::write(&html, "<html></html>").unwrap();

        let mut api = MockContentApi::new();
        expect_login(&mut api);
        api.expect_get_repo().returning(|_, _| Ok(Some(shelf())));
        api.expect_get_file().returning(|_, _| Ok(None));
        api.expect_put_file().times(1).returning(|_, write| {
            Ok(RemoteFile {
                path: write.path,
                sha: "sha".to_string(),
            })
        });

        let result = publisher(api)
            .publish(&html, Some(&temp_dir.path().join("no_assets")))
            .await;

        assert!(result.success);
        assert_eq!(result.files_uploaded, vec!["doc.html"]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("no_assets"));
    }
}
