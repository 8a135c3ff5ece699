use crate::credentials::{AuthorizedToken, OAuthClient};
use crate::errors::{RecapError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Talks to the OAuth token endpoint named by a client secret or token file
pub struct TokenClient {
    client: reqwest::Client,
}

impl TokenClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("recap-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RecapError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Trade an authorization code for an access and refresh token.
    pub async fn exchange_code(
        &self,
        client: &OAuthClient,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
        scopes: &[String],
    ) -> Result<AuthorizedToken> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("code_verifier", code_verifier),
        ];
        let response = self.post(&client.token_uri, &form).await?;

        if response.refresh_token.is_none() {
            log::warn!("Token endpoint returned no refresh token; CI runs will fail once the access token expires");
        }

        let mut extra = serde_json::Map::new();
        extra.insert("universe_domain".to_string(), "googleapis.com".into());
        extra.insert("account".to_string(), "".into());

        let granted_scopes = granted_scopes(response.scope.as_deref(), scopes);
        let expiry = expiry_after(Utc::now(), response.expires_in)?;
        Ok(AuthorizedToken {
            token: Some(response.access_token),
            refresh_token: response.refresh_token,
            token_uri: client.token_uri.clone(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            scopes: granted_scopes,
            expiry,
            extra,
        })
    }

    /// Get a fresh access token. The refresh token is kept when the endpoint
    /// does not rotate it.
    pub async fn refresh(&self, token: &AuthorizedToken) -> Result<AuthorizedToken> {
        let refresh_token = match token.refresh_token.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => {
                return Err(RecapError::OAuthError(
                    "Token has no refresh token; run `recap auth login` again".to_string(),
                ))
            }
        };

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
        ];
        let response = self.post(&token.token_uri, &form).await?;

        let mut refreshed = token.clone();
        refreshed.token = Some(response.access_token);
        if let Some(rotated) = response.refresh_token {
            refreshed.refresh_token = Some(rotated);
        }
        if let Some(scope) = response.scope.as_deref() {
            refreshed.scopes = granted_scopes(Some(scope), &token.scopes);
        }
        refreshed.expiry = expiry_after(Utc::now(), response.expires_in)?;

        log::info!("Refreshed access token for client {}", token.client_id);
        Ok(refreshed)
    }

    async fn post(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        log::debug!("POST {}", token_uri);
        let response = self.client.post(token_uri).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body.trim()),
            };
            return Err(RecapError::OAuthError(format!(
                "Token endpoint rejected the request ({})",
                message
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            RecapError::OAuthError(format!("Unexpected token endpoint response: {}", e))
        })
    }
}

/// Absolute expiry for an `expires_in` lifetime. Lifetimes that do not fit
/// a timestamp are rejected.
fn expiry_after(now: DateTime<Utc>, expires_in: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    let Some(secs) = expires_in else {
        return Ok(None);
    };
    TimeDelta::try_seconds(secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .map(Some)
        .ok_or_else(|| {
            RecapError::OAuthError(format!(
                "Token endpoint returned an out-of-range expires_in ({})",
                secs
            ))
        })
}

fn granted_scopes(granted: Option<&str>, requested: &[String]) -> Vec<String> {
    match granted {
        Some(scope) if !scope.trim().is_empty() => {
            scope.split_whitespace().map(str::to_string).collect()
        }
        _ => requested.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granted_scopes_fall_back_to_requested() {
        let requested = vec!["a".to_string()];
        assert_eq!(granted_scopes(Some("x y"), &requested), vec!["x", "y"]);
        assert_eq!(granted_scopes(Some(" "), &requested), vec!["a"]);
        assert_eq!(granted_scopes(None, &requested), vec!["a"]);
    }

    #[test]
    fn test_expiry_after() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, None).unwrap(), None);
        assert_eq!(
            expiry_after(now, Some(3599)).unwrap(),
            Some(now + TimeDelta::seconds(3599))
        );
        for secs in [i64::MAX, i64::MIN, 9_000_000_000_000_000] {
            let err = expiry_after(now, Some(secs)).unwrap_err();
            assert!(matches!(err, RecapError::OAuthError(ref m) if m.contains("out-of-range")));
        }
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_early() {
        let token = AuthorizedToken::parse(
            r#"{"token": "at", "client_id": "id", "client_secret": "cs"}"#,
            std::path::Path::new("t.json"),
        )
        .unwrap();
        let err = TokenClient::new().unwrap().refresh(&token).await.unwrap_err();
        assert!(matches!(err, RecapError::OAuthError(_)));
    }
}
