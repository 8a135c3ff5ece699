use super::Pkce;
use crate::credentials::OAuthClient;

/// Consent page URL for the installed-app flow.
///
/// Asks for offline access and forces the consent prompt so Google issues a
/// refresh token even when the user approved this client before.
pub fn authorization_url(
    client: &OAuthClient,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
    pkce: &Pkce,
) -> String {
    let scope = scopes.join(" ");
    let params = [
        ("response_type", "code"),
        ("client_id", client.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("state", state),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("code_challenge", pkce.challenge()),
        ("code_challenge_method", "S256"),
    ];

    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if client.auth_uri.contains('?') { '&' } else { '?' };
    format!("{}{}{}", client.auth_uri, separator, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ClientSecret;
    use std::collections::HashMap;
    use std::path::Path;

    fn query_params(url: &str) -> HashMap<String, String> {
        let (_, query) = url.split_once('?').unwrap();
        query
            .split('&')
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap();
                (k.to_string(), urlencoding::decode(v).unwrap().into_owned())
            })
            .collect()
    }

    #[test]
    fn test_authorization_url_parameters() {
        let secret = ClientSecret::parse(
            r#"{"installed": {"client_id": "123.apps.googleusercontent.com", "client_secret": "cs"}}"#,
            Path::new("movies.json"),
        )
        .unwrap();
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        let scopes = vec![
            "https://www.googleapis.com/auth/youtube.upload".to_string(),
            "openid".to_string(),
        ];

        let url = authorization_url(
            secret.client(),
            "http://localhost:8765/",
            &scopes,
            "state-1",
            &pkce,
        );
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(!url.contains(' '));

        let params = query_params(&url);
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "123.apps.googleusercontent.com");
        assert_eq!(params["redirect_uri"], "http://localhost:8765/");
        assert_eq!(
            params["scope"],
            "https://www.googleapis.com/auth/youtube.upload openid"
        );
        assert_eq!(params["state"], "state-1");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["code_challenge"], "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
        assert_eq!(params["code_challenge_method"], "S256");
    }
}
