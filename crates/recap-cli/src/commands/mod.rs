pub mod auth;
pub mod doctor;
pub mod secrets;
pub mod topics;
pub mod workflow;

use anyhow::{Context as _, Result};
use recap_core::config::ConfigLoader;
use recap_core::{ChannelName, CredentialLayout, GitHubClient, RecapConfig, RepoRef};
use std::path::PathBuf;

/// State shared by every command: the loaded configuration and where it came from
pub struct Context {
    pub config_path: PathBuf,
    pub config: RecapConfig,
    pub config_found: bool,
}

impl Context {
    pub async fn load(config_path: PathBuf) -> Result<Self> {
        let config_found = config_path.is_file();
        let config = ConfigLoader::from_file_or_default(&config_path)
            .await
            .with_context(|| format!("Failed to load {}", config_path.display()))?;
        log::debug!(
            "Loaded configuration from {} (found: {})",
            config_path.display(),
            config_found
        );
        Ok(Self {
            config_path,
            config,
            config_found,
        })
    }

    pub fn layout(&self) -> CredentialLayout {
        CredentialLayout::from_config(&self.config)
    }

    pub fn channel(&self, explicit: Option<&str>) -> Result<ChannelName> {
        Ok(self.config.resolve_channel(explicit)?)
    }

    /// `--repo`, then `github.repository`, then the `origin` remote of the
    /// project's git checkout.
    pub async fn repository(&self, explicit: Option<&str>) -> Result<RepoRef> {
        if let Some(repo) = explicit {
            return Ok(RepoRef::parse(repo)?);
        }
        if let Some(repo) = self.config.repository()? {
            return Ok(repo);
        }
        RepoRef::from_git_config(&self.config.base_dir, "origin")
            .await
            .context("No repository given; pass --repo owner/name or set github.repository")
    }

    pub fn github(&self) -> Result<GitHubClient> {
        Ok(GitHubClient::from_env(self.config.github.api_base.as_str())?)
    }
}
