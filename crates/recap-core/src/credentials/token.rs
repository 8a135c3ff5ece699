//! Authorized-user token files
//!
//! The layout matches what google-auth's `Credentials.to_json()` writes, so a
//! token produced here can be loaded by the upload pipeline and vice versa.
//! Fields this crate does not know about are carried through untouched.

use super::client_secret::GOOGLE_TOKEN_URI;
use super::write_private;
use crate::errors::{RecapError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorizedToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "expiry_format")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Debug for AuthorizedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthorizedToken")
            .field("token", &redact(&self.token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl AuthorizedToken {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RecapError::credentials(path, format!("failed to read: {}", e)))?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let token: AuthorizedToken = serde_json::from_str(content).map_err(|e| {
            RecapError::credentials(origin, format!("not a valid OAuth token: {}", e))
        })?;
        if token.token.is_none() && token.refresh_token.is_none() {
            return Err(RecapError::credentials(
                origin,
                "token file holds neither an access token nor a refresh token",
            ));
        }
        Ok(token)
    }

    /// Write the token as pretty JSON, readable by the owner only on Unix.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut serialized = serde_json::to_string_pretty(self)
            .map_err(|e| RecapError::credentials(path, format!("failed to serialize: {}", e)))?;
        serialized.push('\n');

        write_private(path, &serialized).await?;

        log::info!("Saved OAuth token to {}", path.display());
        Ok(())
    }

    /// A token without an expiry is treated as still valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// google-auth writes `2024-05-01T10:00:00.123456Z` and parses the part
/// before the fraction as UTC. RFC 3339 with an offset is accepted as well.
mod expiry_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(expiry) => serializer.serialize_str(&expiry.format(WRITE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid expiry '{}'", raw))),
        }
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        let trimmed = raw.trim_end_matches('Z');
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
