//! OAuth client secret files as downloaded from the cloud console

use crate::errors::{RecapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Application type the client was registered as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Installed,
    Web,
}

/// Client registration inside the `installed` or `web` section
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("redirect_uris", &self.redirect_uris)
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    #[serde(default)]
    installed: Option<OAuthClient>,
    #[serde(default)]
    web: Option<OAuthClient>,
}

/// Parsed and validated client secret
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSecret {
    kind: ClientKind,
    client: OAuthClient,
}

impl ClientSecret {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RecapError::credentials(path, format!("failed to read: {}", e)))?;
        Self::parse(&content, path)
    }

    /// Parse file content; `origin` only labels errors.
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(content).map_err(|e| {
            RecapError::credentials(origin, format!("not a valid client secret: {}", e))
        })?;

        let (kind, client) = match (file.installed, file.web) {
            (Some(client), _) => (ClientKind::Installed, client),
            (None, Some(client)) => (ClientKind::Web, client),
            (None, None) => {
                return Err(RecapError::credentials(
                    origin,
                    "expected an 'installed' or 'web' section",
                ))
            }
        };

        for (field, value) in [
            ("client_id", &client.client_id),
            ("client_secret", &client.client_secret),
            ("auth_uri", &client.auth_uri),
            ("token_uri", &client.token_uri),
        ] {
            if value.trim().is_empty() {
                return Err(RecapError::credentials(
                    origin,
                    format!("field '{}' is empty", field),
                ));
            }
        }

        Ok(Self { kind, client })
    }

    pub fn kind(&self) -> ClientKind {
        self.kind
    }

    pub fn client(&self) -> &OAuthClient {
        &self.client
    }
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}
