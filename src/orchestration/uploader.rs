//! File Uploader - writes one local file into the repository
//!
//! Uploading is a two-step protocol:
//! 1. [`FileUploader::probe`] looks for an object at the remote path and
//!    returns its fingerprint (git blob SHA-1).
//! 2. [`FileUploader::write`] executes the [`UploadPlan`] derived from the
//!    probe: create, update with the probed fingerprint, or nothing when the
//!    remote bytes already match.
//!
//! The remote refuses updates without the current fingerprint, which keeps
//! concurrent writers from silently overwriting each other.

use crate::core::error::ApiError;
use crate::core::traits::{ContentApi, FileWrite, RemoteFile, RepositoryHandle};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a single upload did not go through
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Git blob SHA-1 of `content`, the fingerprint the contents API reports
pub fn blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// What the write step has to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPlan {
    Create,
    Update { sha: String },
    /// Remote already holds these exact bytes
    Unchanged { sha: String },
}

impl UploadPlan {
    /// Decide from the local fingerprint and the probe result
    pub fn from_probe(local_sha: &str, existing: Option<&RemoteFile>) -> Self {
        match existing {
            None => Self::Create,
            Some(remote) if remote.sha == local_sha => Self::Unchanged {
                sha: remote.sha.clone(),
            },
            Some(remote) => Self::Update {
                sha: remote.sha.clone(),
            },
        }
    }
}

/// Result of an acknowledged upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Created(RemoteFile),
    Updated(RemoteFile),
    Unchanged(RemoteFile),
}

impl UploadOutcome {
    pub fn file(&self) -> &RemoteFile {
        match self {
            Self::Created(file) | Self::Updated(file) | Self::Unchanged(file) => file,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Unchanged(_) => "unchanged",
        }
    }
}

/// Uploads single files through a [`ContentApi`]
pub struct FileUploader<'a, A: ContentApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: ContentApi + ?Sized> FileUploader<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Step 1: look up the object currently stored at `remote_path`
    pub async fn probe(
        &self,
        repo: &RepositoryHandle,
        remote_path: &str,
    ) -> Result<Option<RemoteFile>, ApiError> {
        let existing = self.api.get_file(repo, remote_path).await?;
        tracing::debug!(
            repo = %repo.full_name,
            path = remote_path,
            exists = existing.is_some(),
            "Probed remote path"
        );
        Ok(existing)
    }

    /// Step 2: carry out `plan` for `content`
    pub async fn write(
        &self,
        repo: &RepositoryHandle,
        remote_path: &str,
        content: Vec<u8>,
        commit_message: &str,
        plan: UploadPlan,
    ) -> Result<UploadOutcome, ApiError> {
        let sha = match plan {
            UploadPlan::Unchanged { sha } => {
                return Ok(UploadOutcome::Unchanged(RemoteFile {
                    path: remote_path.to_string(),
                    sha,
                }));
            }
            UploadPlan::Create => None,
            UploadPlan::Update { sha } => Some(sha),
        };

        let is_update = sha.is_some();
        let written = self
            .api
            .put_file(
                repo,
                FileWrite {
                    path: remote_path.to_string(),
                    content,
                    message: commit_message.to_string(),
                    sha,
                },
            )
            .await?;

        Ok(if is_update {
            UploadOutcome::Updated(written)
        } else {
            UploadOutcome::Created(written)
        })
    }

    /// Read, probe and write `local_path` to `remote_path`
    pub async fn upload(
        &self,
        repo: &RepositoryHandle,
        local_path: &Path,
        remote_path: &str,
        commit_message: &str,
    ) -> Result<UploadOutcome, UploadError> {
        let content = tokio::fs::read(local_path)
            .await
            .map_err(|source| UploadError::Read {
                path: local_path.to_path_buf(),
                source,
            })?;

        let existing = self.probe(repo, remote_path).await?;
        let plan = UploadPlan::from_probe(&blob_sha(&content), existing.as_ref());

        Ok(self
            .write(repo, remote_path, content, commit_message, plan)
            .await?)
    }

    /// Upload and report only whether the remote acknowledged the file
    ///
    /// Never fails: every problem is logged and turned into `false`, so one
    /// bad asset cannot stop the files after it.
    pub async fn upload_file(
        &self,
        repo: &RepositoryHandle,
        local_path: &Path,
        remote_path: &str,
        commit_message: &str,
    ) -> bool {
        match self.upload(repo, local_path, remote_path, commit_message).await {
            Ok(outcome) => {
                tracing::info!(
                    repo = %repo.full_name,
                    path = remote_path,
                    sha = %outcome.file().sha,
                    outcome = outcome.kind(),
                    "Uploaded file"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    repo = %repo.full_name,
                    path = remote_path,
                    error = %e,
                    "Upload failed"
                );
                false
            }
        }
    }
}
