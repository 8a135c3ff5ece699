//! Configuration loader for `config.toml` and environment overrides
//!
//! Values injected by CI take precedence over the file: `PEXELS_API_KEY`
//! replaces the stock footage key and `GITHUB_REPOSITORY` (set by the runner)
//! fills in the repository when the file does not name one.

use crate::config::types::RecapConfig;
use crate::errors::{RecapError, Result};
use crate::secrets::SecretName;
use std::env;
use std::path::Path;
use tokio::fs;

pub const GITHUB_REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<RecapConfig> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            RecapError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content, base_dir_of(path))
    }

    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist. Unreadable or malformed files still fail.
    pub async fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<RecapConfig> {
        let path = path.as_ref();
        let exists = fs::try_exists(path).await.map_err(|e| {
            RecapError::ConfigError(format!(
                "Cannot access config file {}: {}",
                path.display(),
                e
            ))
        })?;
        if exists {
            return Self::from_file(path).await;
        }

        log::warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        let mut config = RecapConfig::with_base_dir(base_dir_of(path));
        Self::apply_environment(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str, base_dir: &Path) -> Result<RecapConfig> {
        let mut config: RecapConfig = toml::from_str(content)
            .map_err(|e| RecapError::ConfigError(format!("Failed to parse TOML config: {}", e)))?;
        config.base_dir = base_dir.to_path_buf();

        Self::apply_environment(&mut config);
        config.validate()?;

        Ok(config)
    }

    fn apply_environment(config: &mut RecapConfig) {
        if let Ok(key) = env::var(SecretName::PexelsApiKey.as_str()) {
            if !key.trim().is_empty() {
                log::debug!("Using stock footage API key from environment");
                config.app.pexels_api_keys = vec![key.trim().to_string()];
            }
        }

        if config.github.repository.is_none() {
            if let Ok(repo) = env::var(GITHUB_REPOSITORY_ENV) {
                if !repo.trim().is_empty() {
                    log::debug!("Using repository {} from environment", repo);
                    config.github.repository = Some(repo.trim().to_string());
                }
            }
        }
    }
}

fn base_dir_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
