//! Error handling for document publishing
//!
//! Setup faults that abort a publish attempt are modelled as [`PublishError`].
//! Failures reported by the remote content API are [`ApiError`], and the
//! on-disk settings store reports [`ConfigError`].

use std::path::PathBuf;
use thiserror::Error;

/// Error returned by the remote content API boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The remote answered with a non-success status and an error payload
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// The request never produced a response (DNS, TLS, connection reset, ...)
    #[error("network error: {0}")]
    Transport(String),

    /// The remote answered with a success status but an unexpected body
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code, if the remote answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    /// Message text as reported by the remote, without the status suffix
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Transport(message) | Self::Decode(message) => message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }

    /// Only transport faults are worth repeating; the remote already rejected
    /// everything else on its merits.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Setup fault that makes a whole publish attempt fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Could not look up repository {repo}: {message}")]
    RepositoryLookup { repo: String, message: String },

    #[error("Could not create repository {repo}: {message}")]
    RepositoryCreate { repo: String, message: String },

    #[error("Invalid input {}: {message}", path.display())]
    InvalidInput { path: PathBuf, message: String },
}

impl PublishError {
    /// Check if retrying the publish later could succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidInput { .. })
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Connection { .. } => vec![
                "Check that the GitHub token is valid and has not been revoked",
                "Check your internet connection",
            ],
            Self::RepositoryLookup { .. } => vec![
                "Check that the token has the 'repo' scope",
                "Try again in a few moments",
            ],
            Self::RepositoryCreate { .. } => vec![
                "Choose a different repository name",
                "Check that the token is allowed to create repositories",
            ],
            Self::InvalidInput { .. } => vec!["Export the document again and retry"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "CONNECTION_FAILED",
            Self::RepositoryLookup { .. } => "REPOSITORY_LOOKUP_FAILED",
            Self::RepositoryCreate { .. } => "REPOSITORY_CREATE_FAILED",
            Self::InvalidInput { .. } => "INVALID_INPUT",
        }
    }
}

/// Error raised by the settings store
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the home directory")]
    HomeNotFound,

    #[error("Could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {} is corrupted: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::HomeNotFound => "HOME_NOT_FOUND",
            Self::Io { .. } => "CONFIG_IO",
            Self::Parse { .. } => "CONFIG_CORRUPTED",
        }
    }
}
