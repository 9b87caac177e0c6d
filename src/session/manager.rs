//! Spotify session: the refresh token on disk and the access token in memory.
//!
//! The access token is cached with an expiry and refreshed lazily the next
//! time a handler asks for it. A 401 from the Web API also drops it.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::store::TokenFile;
use crate::error::DashboardError;
use crate::providers::{OAuthProvider, TokenSet};

/// Access tokens are treated as stale this long before their real expiry.
const EXPIRY_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

pub struct TokenManager {
    provider: Arc<dyn OAuthProvider>,
    store: TokenFile,
    refresh_token: RwLock<Option<String>>,
    access_token: RwLock<Option<AccessToken>>,
}

impl TokenManager {
    /// Build the manager, reading any persisted refresh token once.
    pub async fn load(
        provider: Arc<dyn OAuthProvider>,
        store: TokenFile,
    ) -> Result<Self, DashboardError> {
        let refresh_token = store.load().await?;
        if refresh_token.is_some() {
            info!("Refresh token loaded from {}", store.path().display());
        } else {
            info!("No stored refresh token; visit /login to connect {}", provider.id());
        }

        Ok(Self {
            provider,
            store,
            refresh_token: RwLock::new(refresh_token),
            access_token: RwLock::new(None),
        })
    }

    pub async fn has_refresh_token(&self) -> bool {
        self.refresh_token.read().await.is_some()
    }

    /// Authorization URL for a fresh PKCE challenge.
    pub fn auth_url(&self, code_challenge: &str) -> String {
        self.provider.auth_url(code_challenge)
    }

    /// The cached access token, if it has not expired.
    pub async fn cached_access_token(&self) -> Option<String> {
        let now = Utc::now();
        self.access_token
            .read()
            .await
            .as_ref()
            .filter(|t| t.is_fresh(now))
            .map(|t| t.value.clone())
    }

    /// Return a usable access token, refreshing it if needed.
    ///
    /// `None` means the session is unusable right now: either no refresh token
    /// exists (no network call is made) or the refresh failed. State is left
    /// untouched on failure and nothing is retried.
    pub async fn ensure_access_token(&self) -> Option<String> {
        if let Some(token) = self.cached_access_token().await {
            return Some(token);
        }

        let refresh_token = self.refresh_token.read().await.clone()?;
        match self.refresh_with(&refresh_token).await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Auto token refresh failed: {e}");
                None
            }
        }
    }

    /// Force a refresh regardless of the cache.
    pub async fn refresh(&self) -> Result<String, DashboardError> {
        let refresh_token = self
            .refresh_token
            .read()
            .await
            .clone()
            .ok_or(DashboardError::Unauthorized)?;

        let token = self.refresh_with(&refresh_token).await?;
        info!("Access token refreshed");
        Ok(token)
    }

    /// Finish the authorization-code flow and persist the resulting refresh token.
    pub async fn complete_authorization(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<(), DashboardError> {
        let tokens = self.provider.exchange_code(code, code_verifier).await?;

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            error!("No refresh token returned by {}", self.provider.id());
            return Err(DashboardError::NoRefreshToken);
        };

        self.store.save(&refresh_token).await?;
        *self.refresh_token.write().await = Some(refresh_token);
        self.cache_access_token(&tokens).await;
        info!("Refresh token saved");
        Ok(())
    }

    /// Drop the cached access token so the next request refreshes it.
    pub async fn invalidate_access_token(&self) {
        if self.access_token.write().await.take().is_some() {
            info!("Cached access token discarded after upstream 401");
        }
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<String, DashboardError> {
        let tokens = self.provider.refresh_token(refresh_token).await?;

        if let Some(rotated) = tokens.refresh_token.as_deref() {
            if rotated != refresh_token {
                // Keep the rotated token in memory even if the write fails;
                // the provider may already have revoked the old one.
                match self.store.save(rotated).await {
                    Ok(()) => info!("Refresh token rotated and saved"),
                    Err(e) => error!("Failed to persist rotated refresh token: {e}"),
                }
            }
            *self.refresh_token.write().await = Some(rotated.to_string());
        }

        Ok(self.cache_access_token(&tokens).await)
    }

    async fn cache_access_token(&self, tokens: &TokenSet) -> String {
        let now = Utc::now();
        let fallback = self.fallback_ttl();
        let ttl = match tokens.expires_in {
            Some(secs) => ttl_from_expires_in(secs).unwrap_or_else(|| {
                warn!("Ignoring out-of-range expires_in {secs} from {}", self.provider.id());
                fallback
            }),
            None => fallback,
        };
        let expires_at = now
            .checked_add_signed(ttl)
            .unwrap_or_else(|| now + fallback);

        *self.access_token.write().await = Some(AccessToken {
            value: tokens.access_token.clone(),
            expires_at,
        });
        tokens.access_token.clone()
    }

    fn fallback_ttl(&self) -> Duration {
        Duration::from_std(self.provider.token_ttl()).unwrap_or(Duration::hours(1))
    }
}

/// Longest lifetime accepted from a token response.
const MAX_TTL_SECS: i64 = 60 * 60 * 24 * 365;

fn ttl_from_expires_in(secs: u64) -> Option<Duration> {
    i64::try_from(secs)
        .ok()
        .filter(|secs| *secs <= MAX_TTL_SECS)
        .and_then(Duration::try_seconds)
}
