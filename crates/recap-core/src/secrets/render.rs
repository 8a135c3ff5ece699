//! Output formats for publishing a [`SecretBundle`]

use super::{SecretBundle, SecretName};
use crate::errors::{RecapError, Result};
use crate::github::RepoRef;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretFormat {
    /// `NAME='value'` lines; JSON values are compacted to one line
    Dotenv,
    /// A JSON object keyed by secret name
    Json,
    /// A shell script of `gh secret set` commands
    Gh,
}

impl FromStr for SecretFormat {
    type Err = RecapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dotenv" | "env" => Ok(SecretFormat::Dotenv),
            "json" => Ok(SecretFormat::Json),
            "gh" | "gh-cli" => Ok(SecretFormat::Gh),
            other => Err(RecapError::ValidationError(format!(
                "Unknown secret format '{}', expected dotenv, json or gh",
                other
            ))),
        }
    }
}

impl fmt::Display for SecretFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SecretFormat::Dotenv => "dotenv",
            SecretFormat::Json => "json",
            SecretFormat::Gh => "gh",
        })
    }
}

impl SecretBundle {
    /// Render the bundle. `repo` is only used by [`SecretFormat::Gh`].
    pub fn render(&self, format: SecretFormat, repo: Option<&RepoRef>) -> Result<String> {
        match format {
            SecretFormat::Dotenv => Ok(self.render_dotenv()),
            SecretFormat::Json => self.render_json(),
            SecretFormat::Gh => Ok(self.render_gh(repo)),
        }
    }

    fn single_line(&self, name: SecretName) -> String {
        let value = self.get(name);
        match name {
            SecretName::PexelsApiKey => value.to_string(),
            _ => compact_json(value),
        }
    }

    fn render_dotenv(&self) -> String {
        SecretName::ALL
            .iter()
            .map(|&name| format!("{}={}\n", name, shell_quote(&self.single_line(name))))
            .collect()
    }

    fn render_json(&self) -> Result<String> {
        let map: BTreeMap<&str, &str> = SecretName::ALL
            .iter()
            .map(|&name| (name.as_str(), self.get(name)))
            .collect();
        let mut out = serde_json::to_string_pretty(&map)
            .map_err(|e| RecapError::ValidationError(format!("Failed to serialize secrets: {}", e)))?;
        out.push('\n');
        Ok(out)
    }

    fn render_gh(&self, repo: Option<&RepoRef>) -> String {
        let repo_flag = repo
            .map(|r| format!(" --repo {}", shell_quote(&r.to_string())))
            .unwrap_or_default();

        let mut script = String::from("#!/bin/sh\nset -e\n");
        for name in SecretName::ALL {
            let line = match self.source_path(name) {
                Some(path) => format!(
                    "gh secret set {}{} < {}\n",
                    name,
                    repo_flag,
                    shell_quote(&path.display().to_string())
                ),
                None => format!(
                    "gh secret set {}{} --body {}\n",
                    name,
                    repo_flag,
                    shell_quote(&self.single_line(name))
                ),
            };
            script.push_str(&line);
        }
        script
    }
}

/// Re-serialize JSON without whitespace; non-JSON input is returned trimmed.
fn compact_json(value: &str) -> String {
    serde_json::from_str::<serde_json::Value>(value)
        .ok()
        .and_then(|v| serde_json::to_string(&v).ok())
        .unwrap_or_else(|| value.trim().to_string())
}

/// POSIX single quoting: `it's` becomes `'it'\''s'`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CLIENT_SECRET: &str = "{\n  \"installed\": {\n    \"client_id\": \"id\",\n    \"client_secret\": \"cs\"\n  }\n}";
    const TOKEN: &str = r#"{"token": "at", "refresh_token": "rt", "client_id": "id", "client_secret": "cs"}"#;

    fn bundle() -> SecretBundle {
        SecretBundle::new("it's-a-key", CLIENT_SECRET, TOKEN).unwrap()
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("dotenv".parse::<SecretFormat>().unwrap(), SecretFormat::Dotenv);
        assert_eq!("JSON".parse::<SecretFormat>().unwrap(), SecretFormat::Json);
        assert_eq!("gh".parse::<SecretFormat>().unwrap(), SecretFormat::Gh);
        assert!("yaml".parse::<SecretFormat>().is_err());
    }

    #[test]
    fn test_dotenv_is_one_line_per_secret() {
        let out = bundle().render(SecretFormat::Dotenv, None).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "PEXELS_API_KEY='it'\\''s-a-key'");
        assert_eq!(
            lines[1],
            r#"CLIENT_SECRET_JSON='{"installed":{"client_id":"id","client_secret":"cs"}}'"#
        );
        assert!(lines[2].starts_with("TOKEN_JSON='{"));
    }

    #[test]
    fn test_json_keeps_full_contents() {
        let out = bundle().render(SecretFormat::Json, None).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["CLIENT_SECRET_JSON"], CLIENT_SECRET);
        assert_eq!(parsed["TOKEN_JSON"], TOKEN);
        assert_eq!(parsed["PEXELS_API_KEY"], "it's-a-key");
    }

    #[test]
    fn test_gh_script_reads_files_when_known() {
        let mut bundle = bundle();
        bundle.client_secret_path = Some(PathBuf::from("credentials/movies.json"));
        bundle.token_path = Some(PathBuf::from("credentials/movies_token.json"));
        let repo = RepoRef::parse("someone/movie-recaps").unwrap();

        let out = bundle.render(SecretFormat::Gh, Some(&repo)).unwrap();
        assert!(out.starts_with("#!/bin/sh\nset -e\n"));
        assert!(out.contains(
            "gh secret set PEXELS_API_KEY --repo 'someone/movie-recaps' --body 'it'\\''s-a-key'\n"
        ));
        assert!(out.contains(
            "gh secret set CLIENT_SECRET_JSON --repo 'someone/movie-recaps' < 'credentials/movies.json'\n"
        ));
        assert!(out.contains(
            "gh secret set TOKEN_JSON --repo 'someone/movie-recaps' < 'credentials/movies_token.json'\n"
        ));
    }

    #[test]
    fn test_gh_script_inlines_values_without_files() {
        let out = bundle().render(SecretFormat::Gh, None).unwrap();
        assert!(out.contains("gh secret set TOKEN_JSON --body '{"));
        assert!(!out.contains("--repo"));
    }
}
