//! Asset Walker - enumerates the files that accompany a document
//!
//! Every regular file below the asset directory becomes an [`UploadTarget`]
//! whose remote path is the file's relative path under a fixed prefix
//! (the directory's own name by default). Hidden entries are skipped, and a
//! hidden directory hides everything inside it.
//!
//! Files that cannot be published (unreadable subtrees, names that are not
//! valid UTF-8) come out as [`SkippedAsset`] so callers can report them.

use crate::core::remote_path::{asset_prefix, normalize_prefix, to_remote_path};
use crate::core::traits::UploadTarget;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Entry below the asset directory that could not be turned into an upload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Skipped {}: {reason}", path.display())]
pub struct SkippedAsset {
    pub path: PathBuf,
    pub reason: String,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Deterministic, restartable walk over an asset directory
///
/// Entries come out ordered by relative path, compared component by
/// component, so two walks over the same snapshot yield the same sequence.
///
/// # Examples
///
/// ```no_run
/// use markpigeon_publisher::orchestration::AssetWalker;
///
/// let walker = AssetWalker::new("out/report_assets");
/// for target in walker.targets() {
///     println!("{} -> {}", target.local_path.display(), target.remote_path);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AssetWalker {
    root: PathBuf,
    prefix: String,
}

impl AssetWalker {
    /// Walker rooted at `root`, publishing under the directory's base name
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let prefix = asset_prefix(&root);

        Self { root, prefix }
    }

    /// Override the remote prefix; an empty prefix places files at the repository root
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Lazily walk the directory; each call starts over from the filesystem
    pub fn walk(&self) -> impl Iterator<Item = Result<UploadTarget, SkippedAsset>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(move |entry| match entry {
                Ok(entry) if !entry.file_type().is_file() => None,
                Ok(entry) => Some(self.target(entry)),
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable asset entry");
                    Some(Err(SkippedAsset {
                        path: e.path().unwrap_or(self.root.as_path()).to_path_buf(),
                        reason: e.to_string(),
                    }))
                }
            })
    }

    fn target(&self, entry: DirEntry) -> Result<UploadTarget, SkippedAsset> {
        match to_remote_path(entry.path(), &self.root, &self.prefix) {
            Some(remote_path) => Ok(UploadTarget {
                local_path: entry.into_path(),
                remote_path,
            }),
            None => {
                tracing::warn!(path = %entry.path().display(), "Asset name is not valid UTF-8");
                Err(SkippedAsset {
                    path: entry.into_path(),
                    reason: "file name is not valid UTF-8".to_string(),
                })
            }
        }
    }

    /// Collect the publishable part of the walk
    pub fn targets(&self) -> Vec<UploadTarget> {
        self.walk().filter_map(Result::ok).collect()
    }

    /// Collect the entries the walk had to leave out
    pub fn skipped(&self) -> Vec<SkippedAsset> {
        self.walk().filter_map(Result::err).collect()
    }
}
