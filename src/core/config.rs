//! Persistent user settings for the publisher front ends
//!
//! The publishing core never reads this store itself; front ends load an
//! [`AppConfig`] and hand the token and repository name to the publisher.

use crate::core::error::ConfigError;
use crate::security::token_manager::mask_token;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory override, mostly useful for tests and portable installs
pub const CONFIG_DIR_ENV: &str = "MARKPIGEON_CONFIG_DIR";

/// Repository documents are published to unless the user picks another one
pub const DEFAULT_REPO_NAME: &str = "markpigeon-shelf";

const CONFIG_DIR_NAME: &str = ".markpigeon";
const CONFIG_FILENAME: &str = "config.json";

/// User settings
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub github_token: String,
    pub github_repo_name: String,
    pub github_username: String,
    /// Warn before publishing that the shelf repository is public
    pub privacy_warning_enabled: bool,
    pub has_starred_markpigeon: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github_token: String::new(),
            github_repo_name: DEFAULT_REPO_NAME.to_string(),
            github_username: String::new(),
            privacy_warning_enabled: true,
            has_starred_markpigeon: false,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("github_token", &mask_token(&self.github_token))
            .field("github_repo_name", &self.github_repo_name)
            .field("github_username", &self.github_username)
            .field("privacy_warning_enabled", &self.privacy_warning_enabled)
            .field("has_starred_markpigeon", &self.has_starred_markpigeon)
            .finish()
    }
}

/// Partial update, `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub github_token: Option<String>,
    pub github_repo_name: Option<String>,
    pub github_username: Option<String>,
    pub privacy_warning_enabled: Option<bool>,
    pub has_starred_markpigeon: Option<bool>,
}

/// Directory holding the settings file
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .ok_or(ConfigError::HomeNotFound)?;

    Ok(PathBuf::from(home).join(CONFIG_DIR_NAME))
}

/// Fixed location of the settings file
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

impl AppConfig {
    pub fn update(&mut self, update: ConfigUpdate) {
        if let Some(token) = update.github_token {
            self.github_token = token;
        }
        if let Some(repo_name) = update.github_repo_name {
            self.github_repo_name = repo_name;
        }
        if let Some(username) = update.github_username {
            self.github_username = username;
        }
        if let Some(enabled) = update.privacy_warning_enabled {
            self.privacy_warning_enabled = enabled;
        }
        if let Some(starred) = update.has_starred_markpigeon {
            self.has_starred_markpigeon = starred;
        }
    }

    /// Repository name to publish to, falling back to the default for blanks
    pub fn repo_name(&self) -> &str {
        let name = self.github_repo_name.trim();
        if name.is_empty() { DEFAULT_REPO_NAME } else { name }
    }

    pub fn has_token(&self) -> bool {
        !self.github_token.trim().is_empty()
    }

    /// Load from the fixed location, defaults when nothing was saved yet
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file()?)
    }

    /// Save to the fixed location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write through a temporary sibling so a crash never leaves half a file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp_path, json).map_err(io_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600)).map_err(io_error)?;
        }

        if let Err(source) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(source));
        }

        tracing::debug!(path = %path.display(), "Saved settings");
        Ok(())
    }
}
