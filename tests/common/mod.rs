//! In-memory stand-in for the GitHub contents API
//!
//! Behaves like the real service where the publisher depends on it: updates
//! must carry the current fingerprint, creates must not hit an existing path,
//! and lookups of missing objects come back as `None`.

#![allow(dead_code)]

use async_trait::async_trait;
use markpigeon_publisher::core::{
    ApiError, ContentApi, FileWrite, Identity, NewRepository, RemoteFile, RepositoryHandle,
};
use markpigeon_publisher::orchestration::blob_sha;
use markpigeon_publisher::remote::pages_url;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

pub const LOGIN: &str = "testuser";

#[derive(Default)]
struct State {
    repos: HashMap<String, RepositoryHandle>,
    /// `owner/name` -> path -> (content, sha)
    files: HashMap<String, BTreeMap<String, (Vec<u8>, String)>>,
    starred: HashSet<String>,
    writes: usize,
    pages_enabled: HashSet<String>,
}

#[derive(Default)]
pub struct FakeContentApi {
    state: Mutex<State>,
    reject_credentials: bool,
    failing_paths: HashSet<String>,
}

impl FakeContentApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails the way GitHub answers a revoked token
    pub fn with_bad_credentials() -> Self {
        Self {
            reject_credentials: true,
            ..Self::default()
        }
    }

    /// Writes to `path` are refused
    pub fn failing_on(mut self, path: &str) -> Self {
        self.failing_paths.insert(path.to_string());
        self
    }

    pub fn with_repo(self, name: &str) -> Self {
        let handle = handle(LOGIN, name);
        self.state
            .lock()
            .unwrap()
            .repos
            .insert(handle.full_name.clone(), handle);
        self
    }

    pub fn has_repo(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .repos
            .contains_key(&format!("{}/{}", LOGIN, name))
    }

    pub fn pages_enabled(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .pages_enabled
            .contains(&format!("{}/{}", LOGIN, name))
    }

    /// Paths stored in `name`, sorted
    pub fn paths(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(&format!("{}/{}", LOGIN, name))
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn content(&self, name: &str, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(&format!("{}/{}", LOGIN, name))
            .and_then(|files| files.get(path))
            .map(|(content, _)| content.clone())
    }

    /// Number of acknowledged writes so far
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn is_starred_by_user(&self, full_name: &str) -> bool {
        self.state.lock().unwrap().starred.contains(full_name)
    }

    fn authorize(&self) -> Result<(), ApiError> {
        if self.reject_credentials {
            Err(ApiError::status(401, "Bad credentials"))
        } else {
            Ok(())
        }
    }
}

fn handle(owner: &str, name: &str) -> RepositoryHandle {
    RepositoryHandle {
        owner: owner.to_string(),
        name: name.to_string(),
        full_name: format!("{}/{}", owner, name),
        default_branch: "main".to_string(),
        html_url: format!("https://github.com/{}/{}", owner, name),
        pages_url: pages_url(owner, name),
    }
}

#[async_trait]
impl ContentApi for FakeContentApi {
    async fn authenticated_user(&self) -> Result<Identity, ApiError> {
        self.authorize()?;
        Ok(Identity {
            login: LOGIN.to_string(),
        })
    }

    async fn get_repo(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<RepositoryHandle>, ApiError> {
        self.authorize()?;
        let key = format!("{}/{}", owner, name);
        Ok(self.state.lock().unwrap().repos.get(&key).cloned())
    }

    async fn create_repo(&self, repo: NewRepository) -> Result<RepositoryHandle, ApiError> {
        self.authorize()?;
        let handle = handle(LOGIN, &repo.name);
        let mut state = self.state.lock().unwrap();
        if state.repos.contains_key(&handle.full_name) {
            return Err(ApiError::status(
                422,
                "Repository creation failed: name already exists on this account",
            ));
        }
        state.repos.insert(handle.full_name.clone(), handle.clone());
        if repo.auto_init {
            let readme = b"# shelf\n".to_vec();
            let sha = blob_sha(&readme);
            state
                .files
                .entry(handle.full_name.clone())
                .or_default()
                .insert("README.md".to_string(), (readme, sha));
        }
        Ok(handle)
    }

    async fn enable_pages(&self, repo: &RepositoryHandle) -> Result<(), ApiError> {
        self.authorize()?;
        self.state
            .lock()
            .unwrap()
            .pages_enabled
            .insert(repo.full_name.clone());
        Ok(())
    }

    async fn get_file(
        &self,
        repo: &RepositoryHandle,
        path: &str,
    ) -> Result<Option<RemoteFile>, ApiError> {
        self.authorize()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(&repo.full_name)
            .and_then(|files| files.get(path))
            .map(|(_, sha)| RemoteFile {
                path: path.to_string(),
                sha: sha.clone(),
            }))
    }

    async fn put_file(
        &self,
        repo: &RepositoryHandle,
        write: FileWrite,
    ) -> Result<RemoteFile, ApiError> {
        self.authorize()?;
        if self.failing_paths.contains(&write.path) {
            return Err(ApiError::status(422, "file could not be processed"));
        }

        let mut state = self.state.lock().unwrap();
        let files = state.files.entry(repo.full_name.clone()).or_default();
        let current = files.get(&write.path).map(|(_, sha)| sha.clone());

        match (&current, &write.sha) {
            (Some(_), None) => {
                return Err(ApiError::status(422, "Invalid request. \"sha\" wasn't supplied."));
            }
            (Some(current), Some(given)) if current != given => {
                return Err(ApiError::status(
                    409,
                    format!("{} does not match {}", write.path, given),
                ));
            }
            (None, Some(_)) => {
                return Err(ApiError::status(404, "Not Found"));
            }
            _ => {}
        }

        let sha = blob_sha(&write.content);
        files.insert(write.path.clone(), (write.content, sha.clone()));
        state.writes += 1;

        Ok(RemoteFile {
            path: write.path,
            sha,
        })
    }

    async fn is_starred(&self, owner: &str, name: &str) -> Result<bool, ApiError> {
        self.authorize()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .starred
            .contains(&format!("{}/{}", owner, name)))
    }

    async fn star(&self, owner: &str, name: &str) -> Result<(), ApiError> {
        self.authorize()?;
        self.state
            .lock()
            .unwrap()
            .starred
            .insert(format!("{}/{}", owner, name));
        Ok(())
    }
}
