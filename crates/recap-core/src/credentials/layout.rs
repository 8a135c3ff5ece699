use super::ChannelName;
use crate::config::RecapConfig;
use crate::errors::{RecapError, Result};
use std::path::{Path, PathBuf};

/// On-disk layout of the per-channel credential files
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialLayout {
    dir: PathBuf,
}

impl CredentialLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &RecapConfig) -> Self {
        Self::new(config.credentials_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<channel>.json`
    pub fn client_secret_path(&self, channel: &ChannelName) -> PathBuf {
        self.dir.join(format!("{}.json", channel))
    }

    /// `<dir>/<channel>_token.json`
    pub fn token_path(&self, channel: &ChannelName) -> PathBuf {
        self.dir.join(format!("{}_token.json", channel))
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            RecapError::credentials(&self.dir, format!("failed to create directory: {}", e))
        })
    }
}
