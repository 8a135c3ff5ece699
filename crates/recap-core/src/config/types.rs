//! Configuration type definitions
//!
//! `config.toml` is shared with the video pipeline: its `[app]` section belongs
//! to the pipeline and only the stock footage API key is read from it. The
//! remaining sections configure this toolkit and are all optional, so an
//! untouched pipeline config loads with defaults.

use crate::credentials::ChannelName;
use crate::errors::{RecapError, Result};
use crate::github::RepoRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecapConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub recap: RecapSection,
    #[serde(default)]
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub github: GitHubSettings,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
    /// Directory relative paths resolve against; the config file's parent.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pexels_api_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pexels_api_key: Option<String>,
}

impl std::fmt::Debug for AppSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSection")
            .field("pexels_api_keys", &self.pexels_api_keys.len())
            .field("pexels_api_key", &self.pexels_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecapSection {
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: PathBuf,
    #[serde(default = "default_topic_history")]
    pub topic_history: PathBuf,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
}

impl Default for RecapSection {
    fn default() -> Self {
        Self {
            credentials_dir: default_credentials_dir(),
            topic_history: default_topic_history(),
            retention_days: default_retention_days(),
            default_channel: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// 0 picks an ephemeral port.
    #[serde(default)]
    pub redirect_port: u16,
    #[serde(default = "default_oauth_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_open_browser")]
    pub open_browser: bool,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            scopes: default_scopes(),
            redirect_port: 0,
            timeout_secs: default_oauth_timeout(),
            open_browser: default_open_browser(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default = "default_workflow")]
    pub workflow: String,
    #[serde(default = "default_git_ref")]
    pub git_ref: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            repository: None,
            workflow: default_workflow(),
            git_ref: default_git_ref(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub topics: Vec<String>,
}

impl RecapConfig {
    /// Defaults rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// First non-empty stock footage API key, list form before single form.
    pub fn pexels_api_key(&self) -> Option<&str> {
        self.app
            .pexels_api_keys
            .iter()
            .map(|k| k.trim())
            .find(|k| !k.is_empty())
            .or_else(|| {
                self.app
                    .pexels_api_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
            })
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.resolve_path(&self.recap.credentials_dir)
    }

    pub fn topic_history_path(&self) -> PathBuf {
        self.resolve_path(&self.recap.topic_history)
    }

    pub fn channel(&self, name: &ChannelName) -> Option<&ChannelConfig> {
        self.channels.get(name.as_str())
    }

    /// Pick the channel to operate on: the explicit one, then
    /// `default_channel`, then the only configured channel.
    pub fn resolve_channel(&self, explicit: Option<&str>) -> Result<ChannelName> {
        if let Some(name) = explicit {
            return ChannelName::new(name);
        }
        if let Some(name) = &self.recap.default_channel {
            return ChannelName::new(name.as_str());
        }
        let mut names = self.channels.keys();
        match (names.next(), names.next()) {
            (Some(only), None) => ChannelName::new(only.as_str()),
            (None, _) => Err(RecapError::ConfigError(
                "No channel given and none configured; pass --channel".to_string(),
            )),
            (Some(_), Some(_)) => Err(RecapError::ConfigError(
                "Several channels configured; pass --channel or set recap.default_channel"
                    .to_string(),
            )),
        }
    }

    pub fn repository(&self) -> Result<Option<RepoRef>> {
        self.github
            .repository
            .as_deref()
            .map(RepoRef::parse)
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        if self.recap.retention_days == 0 {
            return Err(RecapError::ConfigError(
                "recap.retention_days must be greater than 0".to_string(),
            ));
        }

        if self.oauth.timeout_secs == 0 {
            return Err(RecapError::ConfigError(
                "oauth.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.oauth.scopes.is_empty() {
            return Err(RecapError::ConfigError(
                "oauth.scopes cannot be empty".to_string(),
            ));
        }

        if let Some(name) = &self.recap.default_channel {
            ChannelName::new(name.as_str()).map_err(|e| {
                RecapError::ConfigError(format!("recap.default_channel: {}", e))
            })?;
        }

        for (name, channel) in &self.channels {
            ChannelName::new(name.as_str())
                .map_err(|e| RecapError::ConfigError(format!("channels.{}: {}", name, e)))?;
            if channel.topics.iter().any(|t| t.trim().is_empty()) {
                return Err(RecapError::ConfigError(format!(
                    "channels.{}: topics cannot be empty strings",
                    name
                )));
            }
        }

        if self.github.workflow.trim().is_empty() {
            return Err(RecapError::ConfigError(
                "github.workflow cannot be empty".to_string(),
            ));
        }

        self.repository()
            .map_err(|e| RecapError::ConfigError(format!("github.repository: {}", e)))?;

        Ok(())
    }
}

fn default_credentials_dir() -> PathBuf {
    PathBuf::from("credentials")
}

fn default_topic_history() -> PathBuf {
    PathBuf::from("config/topic_history.json")
}

fn default_retention_days() -> u32 {
    90
}

fn default_scopes() -> Vec<String> {
    vec![DEFAULT_YOUTUBE_SCOPE.to_string()]
}

fn default_oauth_timeout() -> u64 {
    300
}

fn default_open_browser() -> bool {
    true
}

fn default_workflow() -> String {
    "main.yml".to_string()
}

fn default_git_ref() -> String {
    "main".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
