pub mod token_manager;

pub use token_manager::{Credential, SecureTokenManager, TokenSource, mask_token};
