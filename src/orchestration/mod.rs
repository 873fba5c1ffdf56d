//! Orchestration layer for document publishing
//!
//! This module provides the high-level components that turn an exported
//! document and its asset directory into files on the shelf repository.

pub mod assets;
pub mod publisher;
pub mod uploader;

// Re-export main types for convenience
pub use assets::{AssetWalker, SkippedAsset};
pub use publisher::{GitHubPublisher, STAR_OWNER, STAR_REPO};
pub use uploader::{FileUploader, UploadError, UploadOutcome, UploadPlan, blob_sha};
