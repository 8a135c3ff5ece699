//! Credential files used by the upload pipeline
//!
//! Each channel owns two files under the credentials directory: the OAuth
//! client secret downloaded from the cloud console (`<channel>.json`) and the
//! token produced by the consent flow (`<channel>_token.json`). Both formats
//! stay compatible with the Python google-auth tooling that consumes them.

pub mod client_secret;
pub mod layout;
mod private_file;
pub mod token;

pub use client_secret::{ClientKind, ClientSecret, OAuthClient};
pub use layout::CredentialLayout;
pub(crate) use private_file::write_private;
pub use token::AuthorizedToken;

use crate::errors::{RecapError, Result};
use std::fmt;
use std::str::FromStr;

/// Name of an upload channel.
///
/// Channel names become file names, so only ASCII alphanumerics, `-`, `_`
/// and `.` are accepted and the name may not start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RecapError::ValidationError(
                "Channel name cannot be empty".to_string(),
            ));
        }
        if name.starts_with('.') {
            return Err(RecapError::ValidationError(format!(
                "Channel name '{}' cannot start with '.'",
                name
            )));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(RecapError::ValidationError(format!(
                "Channel name '{}' contains invalid character '{}'",
                name, bad
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ChannelName {
    type Err = RecapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
