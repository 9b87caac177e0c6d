use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DashboardError;

/// A set of tokens returned from an OAuth provider after code exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// Seam between the token lifecycle and a concrete authorization server.
///
/// Implementations are public clients: they authenticate with PKCE rather
/// than a client secret.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Unique provider identifier (e.g., "spotify").
    fn id(&self) -> &str;

    /// Scopes requested during authorization.
    fn scopes(&self) -> Vec<String>;

    /// Build the authorization URL for the given S256 code challenge.
    fn auth_url(&self, code_challenge: &str) -> String;

    /// Exchange an authorization code plus the matching PKCE verifier for tokens.
    async fn exchange_code(&self, code: &str, code_verifier: &str)
        -> Result<TokenSet, DashboardError>;

    /// Obtain a new access token using a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, DashboardError>;

    /// Nominal access token lifetime, used when the provider omits `expires_in`.
    fn token_ttl(&self) -> Duration {
        Duration::from_secs(3600)
    }
}
