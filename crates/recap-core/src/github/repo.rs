use crate::errors::{RecapError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// `owner/repo` reference to a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse a repository reference from one of:
    /// - owner/repo
    /// - https://github.com/owner/repo(.git)
    /// - ssh://git@github.com/owner/repo.git
    /// - git@github.com:owner/repo.git
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || RecapError::ValidationError(format!("Invalid repository reference: '{}'", input));

        let path = if let Some((_, rest)) = trimmed.split_once("://") {
            // Drop the host (and any user@ prefix) in front of the path
            rest.split_once('/').map(|(_, path)| path).ok_or_else(invalid)?
        } else if let Some((host, path)) = trimmed.split_once(':') {
            if !host.contains('@') && !host.contains('.') {
                return Err(invalid());
            }
            path
        } else {
            trimmed
        };

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != 2 {
            return Err(invalid());
        }
        let (owner, repo) = (parts[0], parts[1]);
        let valid = |s: &str| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(owner) || !valid(repo) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Resolve the URL of `remote` in the git repository containing
    /// `repo_root`. Discovery walks up from `repo_root` and follows `.git`
    /// files, so worktrees and submodules work too.
    pub async fn from_git_config(repo_root: &Path, remote: &str) -> Result<Self> {
        let repo_path = repo_root.to_path_buf();
        let remote_name = remote.to_string();

        let url = tokio::task::spawn_blocking(move || {
            let repo = git2::Repository::discover(&repo_path).map_err(|e| {
                RecapError::ConfigError(format!(
                    "Failed to open git repository at {}: {}",
                    repo_path.display(),
                    e.message()
                ))
            })?;

            let found = repo.find_remote(&remote_name).map_err(|e| {
                RecapError::ConfigError(format!(
                    "Git remote '{}' is not configured: {}",
                    remote_name,
                    e.message()
                ))
            })?;

            let url = found.url().map(str::to_string).ok_or_else(|| {
                RecapError::ConfigError(format!("Git remote '{}' has no UTF-8 URL", remote_name))
            })?;
            Ok::<_, RecapError>(url)
        })
        .await
        .map_err(|e| RecapError::ConfigError(format!("Git remote lookup task failed: {}", e)))??;

        log::debug!("Git remote '{}' points at {}", remote, url);
        Self::parse(&url)
    }
}

impl FromStr for RepoRef {
    type Err = RecapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
