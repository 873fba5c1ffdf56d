//! Core traits and types for document publishing
//!
//! This module defines the data exchanged with the remote content API and the
//! capability trait ([`ContentApi`]) the publisher drives. Keeping the remote
//! behind a trait lets the orchestrator run against a substitute in tests.

use crate::core::error::ApiError;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Remote resources
// ============================================================================

/// Identity the credential authenticates as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub login: String,
}

/// Reference to a remote repository, only obtained through the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryHandle {
    pub owner: String,
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    pub default_branch: String,
    pub html_url: String,
    /// Base URL the repository content is served from, always ending in `/`
    pub pages_url: String,
}

impl RepositoryHandle {
    /// Public URL of a file at `remote_path` inside this repository
    ///
    /// Each path segment is percent-encoded.
    pub fn content_url(&self, remote_path: &str) -> String {
        let segments = remote_path.split('/').filter(|s| !s.is_empty());

        let Ok(mut url) = Url::parse(&self.pages_url) else {
            return format!("{}{}", self.pages_url, remote_path.trim_start_matches('/'));
        };
        match url.path_segments_mut() {
            Ok(mut path) => {
                path.pop_if_empty().extend(segments);
            }
            Err(()) => {
                return format!("{}{}", self.pages_url, remote_path.trim_start_matches('/'));
            }
        }
        url.into()
    }
}

/// Settings for a repository the resolver creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
    pub auto_init: bool,
}

/// Existing content object and its fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub path: String,
    pub sha: String,
}

/// A single content write
#[derive(Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: String,
    pub content: Vec<u8>,
    pub message: String,
    /// Fingerprint of the object being replaced; `None` creates a new object
    pub sha: Option<String>,
}

impl fmt::Debug for FileWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWrite")
            .field("path", &self.path)
            .field("content_len", &self.content.len())
            .field("message", &self.message)
            .field("sha", &self.sha)
            .finish()
    }
}

// ============================================================================
// Publishing
// ============================================================================

/// Local file paired with the repository path it is written to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub local_path: PathBuf,
    /// Root-relative, `/`-separated
    pub remote_path: String,
}

/// Outcome of a publish operation
///
/// `success` implies a non-empty `url`. Asset failures are listed in
/// `errors` even when the entry file made it, see [`PublishResult::has_warnings`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    pub url: String,
    pub message: String,
    pub files_uploaded: Vec<String>,
    pub errors: Vec<String>,
}

impl PublishResult {
    /// Failed result that never reached the upload stage
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Published, but some assets did not make it
    pub fn has_warnings(&self) -> bool {
        self.success && !self.errors.is_empty()
    }
}

/// Progress sink: `(current, total, message)`, called on the publishing task
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

// ============================================================================
// Remote capability trait
// ============================================================================

/// Minimal set of remote operations the publisher needs
///
/// Lookups that can legitimately find nothing return `Ok(None)` instead of a
/// 404 error. Every other failure is an [`ApiError`] carrying the remote's own
/// message text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Resolve the identity behind the credential
    async fn authenticated_user(&self) -> Result<Identity, ApiError>;

    /// Fetch `owner/name`, `None` when it does not exist
    async fn get_repo(&self, owner: &str, name: &str)
    -> Result<Option<RepositoryHandle>, ApiError>;

    /// Create a repository owned by the authenticated identity
    async fn create_repo(&self, repo: NewRepository) -> Result<RepositoryHandle, ApiError>;

    /// Serve the repository's default branch as a static site
    async fn enable_pages(&self, repo: &RepositoryHandle) -> Result<(), ApiError>;

    /// Probe `path` for an existing object, `None` when absent
    async fn get_file(
        &self,
        repo: &RepositoryHandle,
        path: &str,
    ) -> Result<Option<RemoteFile>, ApiError>;

    /// Create or replace the object at `write.path`
    async fn put_file(
        &self,
        repo: &RepositoryHandle,
        write: FileWrite,
    ) -> Result<RemoteFile, ApiError>;

    async fn is_starred(&self, owner: &str, name: &str) -> Result<bool, ApiError>;

    async fn star(&self, owner: &str, name: &str) -> Result<(), ApiError>;
}
