//! Interactive consent flow producing `<channel>_token.json`

use super::{authorization_url, LoopbackReceiver, Pkce, TokenClient};
use crate::config::types::OAuthSettings;
use crate::credentials::{ChannelName, ClientSecret, CredentialLayout};
use crate::errors::{RecapError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// An authorization request waiting for the browser to come back
pub struct PendingAuthorization {
    channel: ChannelName,
    secret: ClientSecret,
    receiver: LoopbackReceiver,
    pkce: Pkce,
    state: String,
    url: String,
}

impl PendingAuthorization {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn redirect_uri(&self) -> String {
        self.receiver.redirect_uri()
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }
}

pub struct InstalledAppFlow {
    settings: OAuthSettings,
    layout: CredentialLayout,
    token_client: TokenClient,
}

impl InstalledAppFlow {
    pub fn new(settings: OAuthSettings, layout: CredentialLayout) -> Result<Self> {
        Ok(Self {
            settings,
            layout,
            token_client: TokenClient::new()?,
        })
    }

    /// Run the whole flow and return the path of the written token file.
    pub async fn run(&self, channel: &ChannelName) -> Result<PathBuf> {
        let pending = self.start(channel).await?;

        println!("Open this URL in a browser to authorize channel '{}':\n", channel);
        println!("  {}\n", pending.url());
        if self.settings.open_browser {
            open_browser(pending.url());
        }
        println!(
            "Waiting up to {}s for the redirect to {} ...",
            self.settings.timeout_secs,
            pending.redirect_uri()
        );

        self.finish(pending).await
    }

    /// Load the client secret, bind the redirect listener and build the
    /// consent URL.
    pub async fn start(&self, channel: &ChannelName) -> Result<PendingAuthorization> {
        let secret_path = self.layout.client_secret_path(channel);
        let exists = tokio::fs::try_exists(&secret_path).await.map_err(|e| {
            RecapError::credentials(&secret_path, format!("cannot access: {}", e))
        })?;
        if !exists {
            return Err(RecapError::credentials(
                &secret_path,
                "client secret not found; download it from the Google Cloud console first",
            ));
        }
        let secret = ClientSecret::from_file(&secret_path).await?;

        let receiver = LoopbackReceiver::bind(self.settings.redirect_port).await?;
        let pkce = Pkce::generate();
        let state = uuid::Uuid::new_v4().to_string();
        let url = authorization_url(
            secret.client(),
            &receiver.redirect_uri(),
            &self.settings.scopes,
            &state,
            &pkce,
        );

        log::info!(
            "Starting OAuth consent for channel {} on {}",
            channel,
            receiver.redirect_uri()
        );
        Ok(PendingAuthorization {
            channel: channel.clone(),
            secret,
            receiver,
            pkce,
            state,
            url,
        })
    }

    /// Wait for the redirect, exchange the code and save the token.
    pub async fn finish(&self, pending: PendingAuthorization) -> Result<PathBuf> {
        let timeout = Duration::from_secs(self.settings.timeout_secs);
        let redirect_uri = pending.receiver.redirect_uri();
        let code = pending.receiver.receive(&pending.state, timeout).await?;

        let token = self
            .token_client
            .exchange_code(
                pending.secret.client(),
                &code,
                &redirect_uri,
                pending.pkce.verifier(),
                &self.settings.scopes,
            )
            .await?;

        self.layout.ensure_dir().await?;
        let token_path = self.layout.token_path(&pending.channel);
        token.save(&token_path).await?;
        Ok(token_path)
    }
}

/// Best effort; the URL is printed either way.
fn open_browser(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        let mut c = std::process::Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = std::process::Command::new("xdg-open");
        c.arg(url);
        c
    };

    match command
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
    {
        Ok(_) => log::debug!("Launched browser for consent URL"),
        Err(e) => log::warn!("Could not open a browser ({}); open the URL manually", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_requires_client_secret() {
        let temp_dir = tempfile::tempdir().unwrap();
        let flow = InstalledAppFlow::new(
            OAuthSettings::default(),
            CredentialLayout::new(temp_dir.path()),
        )
        .unwrap();
        let channel = ChannelName::new("movies").unwrap();

        let err = flow.start(&channel).await.err().unwrap();
        assert!(matches!(err, RecapError::CredentialsError { .. }));
    }

    #[tokio::test]
    async fn test_start_builds_consent_url() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("movies.json"),
            r#"{"installed": {"client_id": "cid", "client_secret": "cs"}}"#,
        )
        .unwrap();
        let settings = OAuthSettings {
            redirect_port: 0,
            ..OAuthSettings::default()
        };
        let flow = InstalledAppFlow::new(settings, CredentialLayout::new(temp_dir.path())).unwrap();
        let channel = ChannelName::new("movies").unwrap();

        let pending = flow.start(&channel).await.unwrap();
        assert!(pending.url().contains("client_id=cid"));
        assert!(pending
            .url()
            .contains(&urlencoding::encode(&pending.redirect_uri()).into_owned()));
        assert_eq!(pending.channel().as_str(), "movies");
    }
}
