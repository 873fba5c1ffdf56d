pub mod github;

pub use github::{DEFAULT_API_URL, GitHubClient, pages_url};
