//! Repository secrets consumed by the CI workflow
//!
//! The workflow expects exactly three secrets: the stock footage API key and
//! the full contents of a channel's client secret and token files. A
//! [`SecretBundle`] is assembled either from the local files (to publish
//! them) or from the environment of a CI run (to write them back to disk).

pub mod bundle;
pub mod render;

pub use bundle::SecretBundle;
pub use render::SecretFormat;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretName {
    PexelsApiKey,
    ClientSecretJson,
    TokenJson,
}

impl SecretName {
    /// In the order the setup steps produce them
    pub const ALL: [SecretName; 3] = [
        SecretName::PexelsApiKey,
        SecretName::ClientSecretJson,
        SecretName::TokenJson,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecretName::PexelsApiKey => "PEXELS_API_KEY",
            SecretName::ClientSecretJson => "CLIENT_SECRET_JSON",
            SecretName::TokenJson => "TOKEN_JSON",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SecretName::PexelsApiKey => "stock footage API key from config.toml",
            SecretName::ClientSecretJson => "contents of credentials/<channel>.json",
            SecretName::TokenJson => "contents of credentials/<channel>_token.json",
        }
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
