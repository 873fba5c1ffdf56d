pub mod config;
pub mod error;
pub mod remote_path;
pub mod retry;
pub mod traits;

pub use config::{AppConfig, ConfigUpdate, DEFAULT_REPO_NAME};
pub use error::*;
pub use retry::*;
pub use traits::*;
