//! Setup checklist
//!
//! Walks the provisioning steps in the order a new deployment performs them
//! (configuration, client secret, consent token, repository publication,
//! repository secrets) and reports which ones are done.

use crate::config::RecapConfig;
use crate::credentials::{AuthorizedToken, ChannelName, ClientKind, ClientSecret, CredentialLayout};
use crate::github::RepoRef;
use crate::secrets::SecretName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;

const DEFAULT_REMOTE: &str = "origin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub step: u8,
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckItem {
    fn new(step: u8, name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            step,
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    pub channel: String,
    pub repository: Option<String>,
    pub ready: bool,
    pub checks: Vec<CheckItem>,
}

impl SetupReport {
    pub async fn run(
        config: &RecapConfig,
        config_found: bool,
        layout: &CredentialLayout,
        channel: &ChannelName,
        repo_root: &Path,
    ) -> Self {
        Self::run_at(config, config_found, layout, channel, repo_root, Utc::now()).await
    }

    pub async fn run_at(
        config: &RecapConfig,
        config_found: bool,
        layout: &CredentialLayout,
        channel: &ChannelName,
        repo_root: &Path,
        now: DateTime<Utc>,
    ) -> Self {
        let (repo_check, repository) = check_repository(config, repo_root).await;
        let checks = vec![
            check_config(config, config_found),
            check_client_secret(layout, channel).await,
            check_token(layout, channel, now).await,
            repo_check,
        ];

        let mut report = Self {
            channel: channel.to_string(),
            repository: repository.map(|r| r.to_string()),
            ready: false,
            checks,
        };
        report.ready = report.is_ready();
        log::debug!(
            "Setup report for {}: {} checks, ready={}",
            report.channel,
            report.checks.len(),
            report.ready
        );
        report
    }

    /// Append the repository secrets step once the API has been queried.
    pub fn with_remote_secrets(mut self, missing: &[SecretName]) -> Self {
        let item = if missing.is_empty() {
            CheckItem::new(
                5,
                "Repository secrets",
                CheckStatus::Pass,
                "PEXELS_API_KEY, CLIENT_SECRET_JSON and TOKEN_JSON are set",
            )
        } else {
            let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
            CheckItem::new(
                5,
                "Repository secrets",
                CheckStatus::Fail,
                format!(
                    "missing {}; run `recap secrets export --format gh` and execute the script",
                    names.join(", ")
                ),
            )
        };
        self.checks.push(item);
        self.ready = self.is_ready();
        self
    }

    pub fn is_ready(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }

    pub fn status_of(&self, step: u8) -> Option<CheckStatus> {
        self.checks.iter().find(|c| c.step == step).map(|c| c.status)
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("Setup status for channel '{}'\n", self.channel);
        for check in &self.checks {
            out.push_str(&format!(
                "  [{}] {}. {}: {}\n",
                check.status, check.step, check.name, check.detail
            ));
        }
        out.push_str(if self.ready {
            "Ready: the workflow has everything it needs.\n"
        } else {
            "Not ready: fix the failed steps above.\n"
        });
        out
    }

    pub fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn check_config(config: &RecapConfig, config_found: bool) -> CheckItem {
    const NAME: &str = "Configuration";
    match (config_found, config.pexels_api_key().is_some()) {
        (true, true) => CheckItem::new(1, NAME, CheckStatus::Pass, "config.toml with Pexels API key"),
        (false, true) => CheckItem::new(
            1,
            NAME,
            CheckStatus::Warn,
            "config.toml not found; Pexels API key comes from the environment",
        ),
        (_, false) => CheckItem::new(
            1,
            NAME,
            CheckStatus::Fail,
            "no Pexels API key; add [app] pexels_api_keys to config.toml or set PEXELS_API_KEY",
        ),
    }
}

async fn check_client_secret(layout: &CredentialLayout, channel: &ChannelName) -> CheckItem {
    const NAME: &str = "OAuth client secret";
    let path = layout.client_secret_path(channel);
    if !path.is_file() {
        return CheckItem::new(
            2,
            NAME,
            CheckStatus::Fail,
            format!("{} not found; download it from the Google Cloud console", path.display()),
        );
    }

    match ClientSecret::from_file(&path).await {
        Ok(secret) => {
            let kind = match secret.kind() {
                ClientKind::Installed => "desktop client",
                ClientKind::Web => "web client",
            };
            CheckItem::new(2, NAME, CheckStatus::Pass, format!("{} ({})", path.display(), kind))
        }
        Err(e) => CheckItem::new(2, NAME, CheckStatus::Fail, e.to_string()),
    }
}

async fn check_token(layout: &CredentialLayout, channel: &ChannelName, now: DateTime<Utc>) -> CheckItem {
    const NAME: &str = "OAuth token";
    let path = layout.token_path(channel);
    if !path.is_file() {
        return CheckItem::new(
            3,
            NAME,
            CheckStatus::Fail,
            format!(
                "{} not found; run `recap auth login --channel {}`",
                path.display(),
                channel
            ),
        );
    }

    let token = match AuthorizedToken::from_file(&path).await {
        Ok(token) => token,
        Err(e) => return CheckItem::new(3, NAME, CheckStatus::Fail, e.to_string()),
    };

    match (token.is_expired(now), token.can_refresh()) {
        (false, true) => CheckItem::new(3, NAME, CheckStatus::Pass, path.display().to_string()),
        (true, true) => CheckItem::new(
            3,
            NAME,
            CheckStatus::Warn,
            "access token expired; it will be refreshed on the next run",
        ),
        (false, false) => CheckItem::new(
            3,
            NAME,
            CheckStatus::Warn,
            "no refresh token; uploads stop working once the access token expires",
        ),
        (true, false) => CheckItem::new(
            3,
            NAME,
            CheckStatus::Fail,
            format!(
                "access token expired and cannot be refreshed; run `recap auth login --channel {}`",
                channel
            ),
        ),
    }
}

async fn check_repository(config: &RecapConfig, repo_root: &Path) -> (CheckItem, Option<RepoRef>) {
    const NAME: &str = "Repository";
    let configured = config.repository().ok().flatten();

    match RepoRef::from_git_config(repo_root, DEFAULT_REMOTE).await {
        Ok(repo) => {
            let item = CheckItem::new(
                4,
                NAME,
                CheckStatus::Pass,
                format!("remote {} points to {}", DEFAULT_REMOTE, repo),
            );
            (item, configured.or(Some(repo)))
        }
        Err(e) => match configured {
            Some(repo) => {
                let item = CheckItem::new(
                    4,
                    NAME,
                    CheckStatus::Warn,
                    format!("{}; using configured repository {}", e, repo),
                );
                (item, Some(repo))
            }
            None => {
                let item = CheckItem::new(
                    4,
                    NAME,
                    CheckStatus::Fail,
                    format!("{}; push the project to a GitHub repository", e),
                );
                (item, None)
            }
        },
    }
}
