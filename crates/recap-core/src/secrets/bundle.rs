use super::SecretName;
use crate::config::RecapConfig;
use crate::credentials::{write_private, AuthorizedToken, ChannelName, ClientSecret, CredentialLayout};
use crate::errors::{RecapError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Values of the three pipeline secrets
#[derive(Clone)]
pub struct SecretBundle {
    pub(crate) pexels_api_key: String,
    pub(crate) client_secret_json: String,
    pub(crate) token_json: String,
    /// Files the JSON secrets were read from, when collected locally
    pub(crate) client_secret_path: Option<PathBuf>,
    pub(crate) token_path: Option<PathBuf>,
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBundle")
            .field("pexels_api_key", &"<redacted>")
            .field("client_secret_json", &"<redacted>")
            .field("token_json", &"<redacted>")
            .field("client_secret_path", &self.client_secret_path)
            .field("token_path", &self.token_path)
            .finish()
    }
}

impl SecretBundle {
    /// Build from values already in hand; the JSON values are validated.
    pub fn new(
        pexels_api_key: impl Into<String>,
        client_secret_json: impl Into<String>,
        token_json: impl Into<String>,
    ) -> Result<Self> {
        let bundle = Self {
            pexels_api_key: pexels_api_key.into(),
            client_secret_json: client_secret_json.into(),
            token_json: token_json.into(),
            client_secret_path: None,
            token_path: None,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Gather the secrets for `channel` from `config.toml` and the
    /// credentials directory.
    pub async fn collect(
        config: &RecapConfig,
        layout: &CredentialLayout,
        channel: &ChannelName,
    ) -> Result<Self> {
        let pexels_api_key = config
            .pexels_api_key()
            .ok_or_else(|| {
                RecapError::secret(
                    SecretName::PexelsApiKey.as_str(),
                    "no pexels_api_keys entry in [app] of config.toml",
                )
            })?
            .to_string();

        let client_secret_path = layout.client_secret_path(channel);
        let client_secret_json = read_secret_file(SecretName::ClientSecretJson, &client_secret_path).await?;

        let token_path = layout.token_path(channel);
        let token_json = read_secret_file(SecretName::TokenJson, &token_path).await?;

        let bundle = Self {
            pexels_api_key,
            client_secret_json,
            token_json,
            client_secret_path: Some(client_secret_path),
            token_path: Some(token_path),
        };
        bundle.validate()?;

        log::info!("Collected pipeline secrets for channel {}", channel);
        Ok(bundle)
    }

    /// Read the secrets a CI run injects as environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: SecretName| {
            lookup(name.as_str())
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| RecapError::secret(name.as_str(), "environment variable is not set"))
        };

        Self::new(
            read(SecretName::PexelsApiKey)?.trim().to_string(),
            read(SecretName::ClientSecretJson)?,
            read(SecretName::TokenJson)?,
        )
    }

    pub fn get(&self, name: SecretName) -> &str {
        match name {
            SecretName::PexelsApiKey => &self.pexels_api_key,
            SecretName::ClientSecretJson => &self.client_secret_json,
            SecretName::TokenJson => &self.token_json,
        }
    }

    pub fn source_path(&self, name: SecretName) -> Option<&Path> {
        match name {
            SecretName::PexelsApiKey => None,
            SecretName::ClientSecretJson => self.client_secret_path.as_deref(),
            SecretName::TokenJson => self.token_path.as_deref(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pexels_api_key.trim().is_empty() {
            return Err(RecapError::secret(
                SecretName::PexelsApiKey.as_str(),
                "value is empty",
            ));
        }
        let origin = |name: SecretName, path: &Option<PathBuf>| {
            path.clone().unwrap_or_else(|| PathBuf::from(name.as_str()))
        };
        ClientSecret::parse(
            &self.client_secret_json,
            &origin(SecretName::ClientSecretJson, &self.client_secret_path),
        )?;
        AuthorizedToken::parse(
            &self.token_json,
            &origin(SecretName::TokenJson, &self.token_path),
        )?;
        Ok(())
    }

    /// Write the secrets back to the layout the pipeline expects: both
    /// credential files for `channel`, and the API key into `config_path`.
    pub async fn materialize(
        &self,
        layout: &CredentialLayout,
        channel: &ChannelName,
        config_path: &Path,
    ) -> Result<()> {
        layout.ensure_dir().await?;

        let client_secret_path = layout.client_secret_path(channel);
        write_secret_file(&client_secret_path, &self.client_secret_json).await?;
        let token_path = layout.token_path(channel);
        write_secret_file(&token_path, &self.token_json).await?;

        write_api_key(config_path, &self.pexels_api_key).await?;

        log::info!(
            "Materialized secrets for channel {} into {} and {}",
            channel,
            layout.dir().display(),
            config_path.display()
        );
        Ok(())
    }
}

async fn read_secret_file(name: SecretName, path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        RecapError::secret(
            name.as_str(),
            format!("cannot read {}: {}", path.display(), e),
        )
    })
}

async fn write_secret_file(path: &Path, content: &str) -> Result<()> {
    let mut content = content.to_string();
    if !content.ends_with('\n') {
        content.push('\n');
    }
    write_private(path, &content).await
}

/// Set `[app] pexels_api_keys = [key]`, keeping every other setting.
async fn write_api_key(config_path: &Path, key: &str) -> Result<()> {
    let exists = tokio::fs::try_exists(config_path).await.map_err(|e| {
        RecapError::ConfigError(format!("Cannot access {}: {}", config_path.display(), e))
    })?;
    let mut document = if exists {
        let content = tokio::fs::read_to_string(config_path).await?;
        content.parse::<toml::Table>().map_err(|e| {
            RecapError::ConfigError(format!(
                "Failed to parse {}: {}",
                config_path.display(),
                e
            ))
        })?
    } else {
        toml::Table::new()
    };

    let app = document
        .entry("app")
        .or_insert(toml::Value::Table(toml::Table::new()));
    let app = app.as_table_mut().ok_or_else(|| {
        RecapError::ConfigError(format!(
            "'app' in {} is not a table",
            config_path.display()
        ))
    })?;
    app.insert(
        "pexels_api_keys".to_string(),
        toml::Value::Array(vec![toml::Value::String(key.to_string())]),
    );

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let serialized = toml::to_string_pretty(&document)
        .map_err(|e| RecapError::ConfigError(format!("Failed to serialize config: {}", e)))?;
    tokio::fs::write(config_path, serialized).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CLIENT_SECRET: &str =
        r#"{"installed": {"client_id": "id", "client_secret": "cs", "redirect_uris": ["http://localhost"]}}"#;
    const TOKEN: &str = r#"{"token": "at", "refresh_token": "rt", "client_id": "id", "client_secret": "cs", "scopes": []}"#;

    fn env_map() -> HashMap<&'static str, String> {
        HashMap::from([
            ("PEXELS_API_KEY", " key \n".to_string()),
            ("CLIENT_SECRET_JSON", CLIENT_SECRET.to_string()),
            ("TOKEN_JSON", TOKEN.to_string()),
        ])
    }

    #[test]
    fn test_from_lookup_reads_all_three() {
        let env = env_map();
        let bundle = SecretBundle::from_lookup(|name| env.get(name).cloned()).unwrap();
        assert_eq!(bundle.get(SecretName::PexelsApiKey), "key");
        assert_eq!(bundle.get(SecretName::ClientSecretJson), CLIENT_SECRET);
        assert_eq!(bundle.get(SecretName::TokenJson), TOKEN);
        assert!(bundle.source_path(SecretName::TokenJson).is_none());
    }

    #[test]
    fn test_from_lookup_names_missing_variable() {
        let mut env = env_map();
        env.remove("TOKEN_JSON");
        let err = SecretBundle::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(err.to_string().contains("TOKEN_JSON"));

        let mut env = env_map();
        env.insert("PEXELS_API_KEY", "   ".to_string());
        let err = SecretBundle::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(err.to_string().contains("PEXELS_API_KEY"));
    }

    #[test]
    fn test_invalid_json_secret_is_rejected() {
        assert!(SecretBundle::new("key", "{}", TOKEN).is_err());
        assert!(SecretBundle::new("key", CLIENT_SECRET, "not json").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let bundle = SecretBundle::new("very-secret-key", CLIENT_SECRET, TOKEN).unwrap();
        let debug = format!("{:?}", bundle);
        assert!(!debug.contains("very-secret-key"));
        assert!(!debug.contains("\"rt\""));
    }

    #[tokio::test]
    async fn test_collect_from_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = RecapConfig {
            app: crate::config::AppSection {
                pexels_api_keys: vec!["file-key".to_string()],
                pexels_api_key: None,
            },
            ..RecapConfig::with_base_dir(temp_dir.path())
        };
        let layout = CredentialLayout::from_config(&config);
        let channel = ChannelName::new("movies").unwrap();

        let err = SecretBundle::collect(&config, &layout, &channel).await.unwrap_err();
        assert!(err.to_string().contains("CLIENT_SECRET_JSON"));

        layout.ensure_dir().await.unwrap();
        std::fs::write(layout.client_secret_path(&channel), CLIENT_SECRET).unwrap();
        let err = SecretBundle::collect(&config, &layout, &channel).await.unwrap_err();
        assert!(err.to_string().contains("TOKEN_JSON"));

        std::fs::write(layout.token_path(&channel), TOKEN).unwrap();
        let bundle = SecretBundle::collect(&config, &layout, &channel).await.unwrap();
        assert_eq!(bundle.get(SecretName::PexelsApiKey), "file-key");
        assert_eq!(
            bundle.source_path(SecretName::ClientSecretJson),
            Some(layout.client_secret_path(&channel).as_path())
        );
    }

    #[tokio::test]
    async fn test_collect_requires_api_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = RecapConfig::with_base_dir(temp_dir.path());
        let layout = CredentialLayout::from_config(&config);
        let channel = ChannelName::new("movies").unwrap();

        let err = SecretBundle::collect(&config, &layout, &channel).await.unwrap_err();
        assert!(err.to_string().contains("PEXELS_API_KEY"));
    }

    #[tokio::test]
    async fn test_materialize_writes_files_and_keeps_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[app]\nvideo_source = \"pexels\"\npexels_api_keys = []\n\n[recap]\nretention_days = 30\n",
        )
        .unwrap();

        let layout = CredentialLayout::new(temp_dir.path().join("credentials"));
        let channel = ChannelName::new("movies").unwrap();
        let bundle = SecretBundle::new("ci-key", CLIENT_SECRET, TOKEN).unwrap();
        bundle.materialize(&layout, &channel, &config_path).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(layout.client_secret_path(&channel)).unwrap().trim_end(),
            CLIENT_SECRET
        );
        assert_eq!(
            std::fs::read_to_string(layout.token_path(&channel)).unwrap().trim_end(),
            TOKEN
        );

        let written: toml::Table = std::fs::read_to_string(&config_path).unwrap().parse().unwrap();
        assert_eq!(written["app"]["video_source"].as_str(), Some("pexels"));
        assert_eq!(written["app"]["pexels_api_keys"][0].as_str(), Some("ci-key"));
        assert_eq!(written["recap"]["retention_days"].as_integer(), Some(30));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for path in [layout.client_secret_path(&channel), layout.token_path(&channel)] {
                let mode = std::fs::metadata(&path).unwrap().permissions().mode();
                assert_eq!(mode & 0o777, 0o600, "{}", path.display());
            }
        }
    }

    #[tokio::test]
    async fn test_materialize_creates_missing_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let layout = CredentialLayout::new(temp_dir.path().join("credentials"));
        let channel = ChannelName::new("movies").unwrap();

        SecretBundle::new("ci-key", CLIENT_SECRET, TOKEN)
            .unwrap()
            .materialize(&layout, &channel, &config_path)
            .await
            .unwrap();

        let written: toml::Table = std::fs::read_to_string(&config_path).unwrap().parse().unwrap();
        assert_eq!(written["app"]["pexels_api_keys"][0].as_str(), Some("ci-key"));
    }
}
