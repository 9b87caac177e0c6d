use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{OAuthProvider, TokenSet};
use crate::error::DashboardError;

/// Scopes needed for playback state, playback control and the library heart button.
const SCOPES: &[&str] = &[
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "user-library-read",
    "user-library-modify",
];

/// Spotify Accounts service, used as a public PKCE client.
///
/// Quirks:
/// - No client secret; the `client_id` travels in the form body.
/// - Refresh responses only sometimes carry a rotated `refresh_token`.
/// - Access tokens live one hour.
pub struct SpotifyProvider {
    client_id: String,
    redirect_uri: String,
    accounts_url: String,
    http: reqwest::Client,
}

// Raw token response from the Accounts token endpoint
#[derive(Debug, Deserialize)]
struct SpotifyTokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

impl From<SpotifyTokenResponse> for TokenSet {
    fn from(resp: SpotifyTokenResponse) -> Self {
        TokenSet {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            token_type: resp.token_type,
            expires_in: resp.expires_in,
            scope: resp.scope,
        }
    }
}

impl SpotifyProvider {
    pub fn new(
        client_id: String,
        redirect_uri: String,
        accounts_url: String,
        http: reqwest::Client,
    ) -> Self {
        Self {
            client_id,
            redirect_uri,
            accounts_url,
            http,
        }
    }

    fn token_endpoint(&self) -> String {
        format!("{}/api/token", self.accounts_url)
    }

    /// POST a grant to the token endpoint and return the raw status and body.
    async fn post_grant(
        &self,
        form: &[(&str, &str)],
    ) -> Result<(reqwest::StatusCode, String), DashboardError> {
        let resp = self
            .http
            .post(self.token_endpoint())
            .form(form)
            .send()
            .await
            .map_err(|e| DashboardError::ProviderError(format!("Token request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| DashboardError::ProviderError(format!("Token response unreadable: {e}")))?;
        Ok((status, body))
    }
}

fn parse_token_body(body: &str) -> Result<TokenSet, DashboardError> {
    serde_json::from_str::<SpotifyTokenResponse>(body)
        .map(TokenSet::from)
        .map_err(|e| DashboardError::InvalidResponse(format!("token response: {e}")))
}

#[async_trait]
impl OAuthProvider for SpotifyProvider {
    fn id(&self) -> &str {
        "spotify"
    }

    fn scopes(&self) -> Vec<String> {
        SCOPES.iter().map(|s| s.to_string()).collect()
    }

    fn auth_url(&self, code_challenge: &str) -> String {
        let scope_str = self.scopes().join(" ");
        format!(
            "{accounts}/authorize?\
             response_type=code\
             &client_id={client_id}\
             &scope={scope}\
             &redirect_uri={redirect_uri}\
             &code_challenge_method=S256\
             &code_challenge={challenge}",
            accounts = self.accounts_url,
            client_id = urlencoding(&self.client_id),
            scope = urlencoding(&scope_str),
            redirect_uri = urlencoding(&self.redirect_uri),
            challenge = urlencoding(code_challenge),
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, DashboardError> {
        let (status, body) = self
            .post_grant(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
                ("code_verifier", code_verifier),
            ])
            .await?;

        if !status.is_success() {
            return Err(DashboardError::ProviderError(format!(
                "Spotify token exchange failed ({status}): {body}"
            )));
        }

        parse_token_body(&body)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, DashboardError> {
        let (status, body) = self
            .post_grant(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
            ])
            .await?;

        if !status.is_success() {
            return Err(DashboardError::RefreshFailed(format!(
                "Spotify refresh failed ({status}): {body}"
            )));
        }

        parse_token_body(&body)
    }
}

/// Simple percent-encoding for URL parameters.
fn urlencoding(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SpotifyProvider {
        SpotifyProvider::new(
            "client-123".into(),
            "http://127.0.0.1:8888/callback".into(),
            "https://accounts.spotify.com".into(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_auth_url_parameters() {
        let url = url::Url::parse(&provider().auth_url("chal-lenge_")).unwrap();
        assert_eq!(url.path(), "/authorize");

        let params: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:8888/callback");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["code_challenge"], "chal-lenge_");
        assert!(params["scope"].contains("user-modify-playback-state"));
        assert_eq!(params["scope"].split(' ').count(), SCOPES.len());
    }

    #[test]
    fn test_parse_token_body_without_refresh_token() {
        let tokens =
            parse_token_body(r#"{"access_token":"at","token_type":"Bearer","expires_in":3600}"#)
                .unwrap();
        assert_eq!(tokens.access_token, "at");
        assert!(tokens.refresh_token.is_none());
        assert_eq!(tokens.expires_in, Some(3600));
    }

    #[test]
    fn test_parse_token_body_rejects_html() {
        let err = parse_token_body("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, DashboardError::InvalidResponse(_)));
    }
}
