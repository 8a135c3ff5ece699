//! Error types for credential provisioning, CI secrets and topic history
//!
//! Every subsystem reports failures through [`RecapError`]. Variants are split
//! by source (configuration, credential files, the OAuth endpoint, the GitHub
//! API, the topic history) so callers can tell a missing file apart from a
//! rejected request without parsing messages.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecapError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Credential file {path}: {message}")]
    CredentialsError { path: PathBuf, message: String },
    #[error("OAuth error: {0}")]
    OAuthError(String),
    #[error("GitHub API error (HTTP {status}): {message}")]
    GitHubError { status: u16, message: String },
    #[error("Secret '{name}' unavailable: {message}")]
    SecretError { name: String, message: String },
    #[error("Topic history error: {0}")]
    TopicCacheError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("I/O error: {0}")]
    IoError(String),
}

impl RecapError {
    pub(crate) fn credentials(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RecapError::CredentialsError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn secret(name: impl Into<String>, message: impl Into<String>) -> Self {
        RecapError::SecretError {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RecapError {
    fn from(err: std::io::Error) -> Self {
        RecapError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for RecapError {
    fn from(err: reqwest::Error) -> Self {
        RecapError::NetworkError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RecapError>;
