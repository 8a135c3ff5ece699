//! Minimal GitHub REST client for secret verification and workflow dispatch
//!
//! Only secret *names* are ever read; values never leave the machine through
//! this client.

use super::RepoRef;
use crate::errors::{RecapError, Result};
use crate::secrets::SecretName;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const GITHUB_TOKEN_ENV: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct SecretList {
    total_count: usize,
    secrets: Vec<SecretEntry>,
}

#[derive(Debug, Deserialize)]
struct SecretEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowList {
    workflows: Vec<Workflow>,
}

#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("recap-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RecapError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Token from `GITHUB_TOKEN`, then `GH_TOKEN`.
    pub fn from_env(api_base: impl Into<String>) -> Result<Self> {
        let token = GITHUB_TOKEN_ENV
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty());
        Self::new(api_base, token)
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn require_token(&self, action: &str) -> Result<()> {
        if self.token.is_none() {
            return Err(RecapError::GitHubError {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: format!(
                    "{} requires a token; set {}",
                    action,
                    GITHUB_TOKEN_ENV.join(" or ")
                ),
            });
        }
        Ok(())
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let mut message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| body.trim().to_string());
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            message.push_str(" (use a personal access token with repo and workflow scope)");
        }

        Err(RecapError::GitHubError {
            status: status.as_u16(),
            message,
        })
    }

    /// Names of the repository's Actions secrets
    pub async fn list_secret_names(&self, repo: &RepoRef) -> Result<Vec<String>> {
        self.require_token("Listing repository secrets")?;

        let mut names = Vec::new();
        let mut page = 1;
        loop {
            let response = self
                .request(
                    Method::GET,
                    &format!("/repos/{}/{}/actions/secrets", repo.owner, repo.repo),
                )
                .query(&[("per_page", PAGE_SIZE), ("page", page)])
                .send()
                .await?;
            let list: SecretList = Self::check(response).await?.json().await?;

            let received = list.secrets.len();
            names.extend(list.secrets.into_iter().map(|s| s.name));
            if received == 0 || names.len() >= list.total_count {
                break;
            }
            page += 1;
        }

        log::debug!("Repository {} has {} secrets", repo, names.len());
        Ok(names)
    }

    /// The pipeline secrets the repository does not define, in canonical order
    pub async fn missing_secrets(&self, repo: &RepoRef) -> Result<Vec<SecretName>> {
        let names = self.list_secret_names(repo).await?;
        Ok(SecretName::ALL
            .iter()
            .copied()
            .filter(|secret| !names.iter().any(|n| n == secret.as_str()))
            .collect())
    }

    pub async fn list_workflows(&self, repo: &RepoRef) -> Result<Vec<Workflow>> {
        let response = self
            .request(
                Method::GET,
                &format!("/repos/{}/{}/actions/workflows", repo.owner, repo.repo),
            )
            .query(&[("per_page", PAGE_SIZE)])
            .send()
            .await?;
        let list: WorkflowList = Self::check(response).await?.json().await?;
        Ok(list.workflows)
    }

    /// Trigger a `workflow_dispatch` run. `workflow` is a file name or id.
    pub async fn dispatch_workflow(
        &self,
        repo: &RepoRef,
        workflow: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.require_token("Dispatching a workflow")?;

        let path = format!(
            "/repos/{}/{}/actions/workflows/{}/dispatches",
            repo.owner,
            repo.repo,
            urlencoding::encode(workflow)
        );
        let body = DispatchRequest { git_ref, inputs };
        let response = self.request(Method::POST, &path).json(&body).send().await?;
        let response = Self::check(response).await?;
        if response.status() != StatusCode::NO_CONTENT {
            return Err(RecapError::GitHubError {
                status: response.status().as_u16(),
                message: format!(
                    "expected 204 No Content from the workflow dispatch endpoint; workflow {} may not have been queued",
                    workflow
                ),
            });
        }

        log::info!(
            "Dispatched workflow {} on {}@{} with {} inputs",
            workflow,
            repo,
            git_ref,
            inputs.len()
        );
        Ok(())
    }
}
