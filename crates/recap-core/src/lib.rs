//! Operational toolkit for the movie recap video pipeline.
//!
//! The pipeline itself (footage download, rendering, upload) runs elsewhere,
//! inside a CI workflow. This crate covers everything around it:
//!
//! - **Configuration**: `config.toml` loading with environment overrides
//! - **Credentials**: the `credentials/<channel>.json` file convention and
//!   the OAuth client secret and token formats
//! - **OAuth**: the interactive installed-app consent flow and token refresh
//! - **Secrets**: turning local files into the three repository secrets and
//!   writing them back to disk inside CI
//! - **GitHub**: repository references, secret verification and manual
//!   workflow dispatch
//! - **Topics**: the per-channel topic usage history that keeps uploads from
//!   repeating themselves
//! - **Doctor**: an ordered checklist of the setup steps

pub mod config;
pub mod credentials;
pub mod doctor;
pub mod errors;
pub mod github;
pub mod oauth;
pub mod secrets;
pub mod topics;

pub use config::{ConfigLoader, RecapConfig};
pub use credentials::{AuthorizedToken, ChannelName, ClientSecret, CredentialLayout};
pub use doctor::{CheckStatus, SetupReport};
pub use errors::{RecapError, Result};
pub use github::{GitHubClient, RepoRef};
pub use oauth::{InstalledAppFlow, TokenClient};
pub use secrets::{SecretBundle, SecretFormat, SecretName};
pub use topics::TopicCache;
