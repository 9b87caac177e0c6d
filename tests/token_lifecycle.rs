//! Refresh token persistence and access token caching against a mock
//! Spotify Accounts service.

mod common;

use common::{token_body, unreachable_url, Harness};
use wallboard::DashboardError;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

fn refresh_grant(refresh_token: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("refresh_token={refresh_token}")))
        .and(body_string_contains("client_id=client-123"))
}

#[tokio::test]
async fn test_ensure_refreshes_once_and_caches() {
    let h = Harness::new(Some("rt-1")).await;
    refresh_grant("rt-1")
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", None, 3600)))
        .expect(1)
        .mount(&h.server)
        .await;

    let session = &h.state.session;
    assert_eq!(session.ensure_access_token().await.as_deref(), Some("at-1"));
    assert_eq!(session.cached_access_token().await.as_deref(), Some("at-1"));
    // Served from cache, no second exchange.
    assert_eq!(session.ensure_access_token().await.as_deref(), Some("at-1"));
    assert_eq!(h.stored_token().as_deref(), Some("rt-1"));
}

#[tokio::test]
async fn test_no_refresh_token_means_no_network() {
    let h = Harness::new(None).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at", None, 3600)))
        .expect(0)
        .mount(&h.server)
        .await;

    assert!(!h.state.session.has_refresh_token().await);
    assert_eq!(h.state.session.ensure_access_token().await, None);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_persisted_and_used() {
    let h = Harness::new(Some("rt-1")).await;
    refresh_grant("rt-1")
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("at-2", Some("rt-2"), 3600)),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    refresh_grant("rt-2")
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-3", None, 3600)))
        .expect(1)
        .mount(&h.server)
        .await;

    assert_eq!(h.state.session.ensure_access_token().await.as_deref(), Some("at-2"));
    assert_eq!(h.stored_token().as_deref(), Some("rt-2"));

    assert_eq!(h.state.session.refresh().await.unwrap(), "at-3");
    assert_eq!(h.stored_token().as_deref(), Some("rt-2"));
}

#[tokio::test]
async fn test_rejected_refresh_leaves_state_unchanged() {
    let h = Harness::new(Some("rt-1")).await;
    refresh_grant("rt-1")
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Refresh token revoked"
        })))
        .mount(&h.server)
        .await;

    assert_eq!(h.state.session.ensure_access_token().await, None);
    assert!(h.state.session.has_refresh_token().await);
    assert_eq!(h.stored_token().as_deref(), Some("rt-1"));

    let err = h.state.session.refresh().await.unwrap_err();
    assert!(matches!(err, DashboardError::RefreshFailed(_)));
}

#[tokio::test]
async fn test_non_json_token_response_is_invalid() {
    let h = Harness::new(Some("rt-1")).await;
    refresh_grant("rt-1")
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&h.server)
        .await;

    let err = h.state.session.refresh().await.unwrap_err();
    assert!(matches!(err, DashboardError::InvalidResponse(_)));
    assert_eq!(h.state.session.cached_access_token().await, None);
}

#[tokio::test]
async fn test_forced_refresh_without_token_is_unauthorized() {
    let h = Harness::new(None).await;
    let err = h.state.session.refresh().await.unwrap_err();
    assert!(matches!(err, DashboardError::Unauthorized));
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed() {
    let h = Harness::new(Some("rt-1")).await;
    refresh_grant("rt-1")
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-short", None, 0)))
        .expect(2)
        .mount(&h.server)
        .await;

    assert!(h.state.session.ensure_access_token().await.is_some());
    assert_eq!(h.state.session.cached_access_token().await, None);
    assert!(h.state.session.ensure_access_token().await.is_some());
}

#[tokio::test]
async fn test_invalidated_access_token_is_refreshed() {
    let h = Harness::new(Some("rt-1")).await;
    refresh_grant("rt-1")
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", None, 3600)))
        .expect(2)
        .mount(&h.server)
        .await;

    assert!(h.state.session.ensure_access_token().await.is_some());
    h.state.session.invalidate_access_token().await;
    assert_eq!(h.state.session.cached_access_token().await, None);
    assert!(h.state.session.ensure_access_token().await.is_some());
}

#[tokio::test]
async fn test_complete_authorization_persists_refresh_token() {
    let h = Harness::new(None).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier=verifier-xyz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("at-1", Some("rt-new"), 3600)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.state
        .session
        .complete_authorization("auth-code", "verifier-xyz")
        .await
        .unwrap();

    assert_eq!(h.stored_token().as_deref(), Some("rt-new"));
    assert!(h.state.session.has_refresh_token().await);
    assert_eq!(h.state.session.cached_access_token().await.as_deref(), Some("at-1"));
}

#[tokio::test]
async fn test_authorization_without_refresh_token_fails() {
    let h = Harness::new(None).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", None, 3600)))
        .mount(&h.server)
        .await;

    let err = h
        .state
        .session
        .complete_authorization("auth-code", "verifier-xyz")
        .await
        .unwrap_err();

    assert!(matches!(err, DashboardError::NoRefreshToken));
    assert!(!h.state.session.has_refresh_token().await);
    assert_eq!(h.stored_token(), None);
}

#[tokio::test]
async fn test_out_of_range_expiry_falls_back_to_provider_ttl() {
    let h = Harness::new(Some("rt-1")).await;
    refresh_grant("rt-1")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("at-1", None, 10_000_000_000_000_000)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h.state.clone();
    let token = tokio::spawn(async move { state.session.ensure_access_token().await })
        .await
        .unwrap();

    assert_eq!(token.as_deref(), Some("at-1"));
    assert_eq!(h.state.session.cached_access_token().await.as_deref(), Some("at-1"));
}

#[tokio::test]
async fn test_unreachable_accounts_service_leaves_state_unchanged() {
    let accounts = unreachable_url();
    let h = Harness::with_env(Some("rt-1"), &[("SPOTIFY_ACCOUNTS_URL", accounts.as_str())]).await;

    assert_eq!(h.state.session.ensure_access_token().await, None);
    assert!(h.state.session.has_refresh_token().await);
    assert_eq!(h.stored_token().as_deref(), Some("rt-1"));
    assert_eq!(h.state.session.cached_access_token().await, None);

    let err = h.state.session.refresh().await.unwrap_err();
    assert!(matches!(err, DashboardError::ProviderError(_)));
}
