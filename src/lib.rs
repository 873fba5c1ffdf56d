pub mod core;
pub mod orchestration;
pub mod remote;
pub mod security;

pub use crate::core::*;
pub use orchestration::{AssetWalker, GitHubPublisher};
pub use remote::GitHubClient;
pub use security::{Credential, SecureTokenManager, TokenSource, mask_token};
