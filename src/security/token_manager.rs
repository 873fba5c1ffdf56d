//! Secure token handling with masking capabilities
//!
//! The GitHub token is wrapped in a [`Credential`] backed by the `secrecy`
//! crate so it cannot end up in logs or `Debug` output by accident.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::fmt;

/// Environment variable consulted for a token
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Placeholder shipped in `.env.example`, never a real token
const PLACEHOLDER_TOKEN: &str = "your_github_token_here";

/// Masks a token for safe logging
///
/// Shows only the first 3 and last 3 characters. Tokens shorter than 10
/// characters are fully masked as "****".
///
/// ```
/// use markpigeon_publisher::security::mask_token;
///
/// assert_eq!(mask_token("abcdef123456"), "abc...456");
/// assert_eq!(mask_token("short"), "****");
/// ```
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }

    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 3..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Opaque authorization token, immutable once created
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        let token: String = token.into();
        Self(SecretString::new(token.into()))
    }

    /// Raw token, only for building the Authorization header
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn masked(&self) -> String {
        mask_token(self.expose())
    }

    pub fn is_empty(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Where a resolved token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Explicit,
    Environment,
    Config,
}

/// Token lookup for front ends
///
/// Resolution order: explicit value, `GITHUB_TOKEN`, saved settings.
///
/// ```
/// use markpigeon_publisher::security::{SecureTokenManager, TokenSource};
///
/// let manager = SecureTokenManager::new();
/// let (token, source) = manager.resolve(Some("ghp_explicit_token"), "").unwrap();
/// assert_eq!(source, TokenSource::Explicit);
/// assert_eq!(token.expose(), "ghp_explicit_token");
/// ```
#[derive(Debug, Clone)]
pub struct SecureTokenManager {
    env_var: String,
}

impl Default for SecureTokenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureTokenManager {
    pub fn new() -> Self {
        Self::with_env_var(TOKEN_ENV_VAR)
    }

    pub fn with_env_var(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Token from the environment, ignoring blanks and the `.env.example` placeholder
    pub fn token_from_env(&self) -> Option<Credential> {
        let value = env::var(&self.env_var).ok()?;
        Self::usable(&value).then(|| Credential::new(value.trim()))
    }

    pub fn resolve(
        &self,
        explicit: Option<&str>,
        configured: &str,
    ) -> Option<(Credential, TokenSource)> {
        if let Some(token) = explicit.filter(|t| Self::usable(t)) {
            return Some((Credential::new(token.trim()), TokenSource::Explicit));
        }

        if let Some(token) = self.token_from_env() {
            return Some((token, TokenSource::Environment));
        }

        Self::usable(configured).then(|| (Credential::new(configured.trim()), TokenSource::Config))
    }

    /// Replaces every occurrence of `credential` in `text` with its masked form
    ///
    /// Remote error bodies sometimes echo request data back; run them through
    /// this before logging.
    pub fn mask_in_string(&self, text: &str, credential: &Credential) -> String {
        if credential.is_empty() {
            return text.to_string();
        }

        match Regex::new(&regex::escape(credential.expose())) {
            Ok(regex) => regex
                .replace_all(text, credential.masked().as_str())
                .to_string(),
            Err(_) => text.to_string(),
        }
    }

    fn usable(token: &str) -> bool {
        let token = token.trim();
        !token.is_empty() && token != PLACEHOLDER_TOKEN
    }
}
