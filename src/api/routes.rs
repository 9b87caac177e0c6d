//! Route handlers for the dashboard server.
//!
//! All handlers receive `SharedState` via Axum state extraction. The Spotify
//! session lives in `state.session`; handlers never touch tokens directly.

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::{DisplaySettings, Features};
use crate::crypto::Pkce;
use crate::error::DashboardError;
use crate::player::{NowPlaying, UpstreamResponse};
use crate::system::{power, SystemReport};
use crate::SharedState;

/// Cookie carrying the PKCE verifier between /login and /callback.
pub const VERIFIER_COOKIE: &str = "pkce_verifier";

const PROXY_PREFIX: &str = "/spotify/api";

// =============================================================================
// Router
// =============================================================================

pub fn dashboard_router(state: SharedState) -> Router {
    Router::new()
        // ── Widgets ──────────────────────────────────────────────────────
        .route("/config", get(dashboard_config))
        .route("/weather", get(weather))
        .route("/system", get(system_info))
        .route("/shutdown", post(shutdown))
        // ── Authorization ────────────────────────────────────────────────
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/callback/", get(callback))
        .route("/token", get(token))
        // ── Spotify ──────────────────────────────────────────────────────
        .route("/spotify/current", get(spotify_current))
        .route("/spotify/player", get(spotify_player))
        .route("/spotify/api/{*path}", any(spotify_proxy))
        .with_state(state)
}

// =============================================================================
// Widgets
// =============================================================================

#[derive(Serialize)]
struct DashboardSettings<'a> {
    #[serde(flatten)]
    features: Features,
    #[serde(flatten)]
    display: &'a DisplaySettings,
}

/// GET /config — Feature flags and clock settings for the frontend.
async fn dashboard_config(State(state): State<SharedState>) -> impl IntoResponse {
    Json(DashboardSettings {
        features: state.config.features,
        display: &state.config.display,
    })
    .into_response()
}

/// GET /weather — Current conditions, or 204 when the widget is disabled.
async fn weather(State(state): State<SharedState>) -> Result<Response, DashboardError> {
    if !state.config.features.weather_enabled {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let report = state.weather.current().await?;
    Ok(Json(report).into_response())
}

/// GET /system — CPU since the previous call, memory and uptime.
async fn system_info(State(state): State<SharedState>) -> Result<Json<SystemReport>, DashboardError> {
    let report = SystemReport::collect(&state.cpu).await?;
    Ok(Json(report))
}

/// POST /shutdown — Power off the device.
async fn shutdown(State(state): State<SharedState>) -> Result<&'static str, DashboardError> {
    if !state.config.features.power_button_enabled {
        return Err(DashboardError::Forbidden("power button is disabled".into()));
    }

    power::shutdown(&state.config.shutdown_command).await?;
    Ok("Shutting down")
}

// =============================================================================
// Authorization
// =============================================================================

/// GET /login — Start the PKCE authorization flow.
async fn login(State(state): State<SharedState>, jar: CookieJar) -> Response {
    if state.session.has_refresh_token().await {
        info!("Login blocked: already authenticated");
        return Redirect::to("/").into_response();
    }

    let pkce = Pkce::generate();
    let auth_url = state.session.auth_url(&pkce.challenge);

    let cookie = Cookie::build((VERIFIER_COOKIE, pkce.verifier))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    (jar.add(cookie), Redirect::to(&auth_url)).into_response()
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// GET /callback — Exchange the authorization code and persist the refresh token.
async fn callback(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(q): Query<CallbackQuery>,
) -> Result<Response, DashboardError> {
    let Some(verifier) = jar.get(VERIFIER_COOKIE).map(|c| c.value().to_string()) else {
        error!("Missing PKCE verifier cookie");
        return Err(DashboardError::MissingVerifier);
    };

    let code = match (q.code, q.error) {
        (Some(code), _) if !code.is_empty() => code,
        (_, Some(reason)) => {
            warn!("Authorization was not granted: {reason}");
            return Err(DashboardError::BadRequest(format!(
                "authorization was not granted: {reason}"
            )));
        }
        _ => return Err(DashboardError::BadRequest("missing authorization code".into())),
    };

    state.session.complete_authorization(&code, &verifier).await?;

    let jar = jar.remove(Cookie::build(VERIFIER_COOKIE).path("/"));
    Ok((jar, Redirect::to("/")).into_response())
}

/// GET /token — Force a refresh and hand the access token to a local caller.
///
/// There is no caller authentication, so only loopback peers are served.
async fn token(
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Json<serde_json::Value>, DashboardError> {
    if !is_loopback(peer.ip()) {
        warn!("Token request from non-local peer {peer} rejected");
        return Err(DashboardError::Forbidden(
            "token endpoint is only available from localhost".into(),
        ));
    }

    let access_token = state.session.refresh().await.inspect_err(|e| {
        error!("Token refresh failed: {e}");
    })?;

    Ok(Json(json!({ "access_token": access_token })))
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or(v6.is_loopback(), |v4| v4.is_loopback()),
    }
}

// =============================================================================
// Spotify
// =============================================================================

/// GET /spotify/current — Now-playing summary for the overlay.
///
/// Every failure degrades to 204 so the overlay simply hides.
async fn spotify_current(State(state): State<SharedState>) -> Response {
    if !state.config.features.spotify_overlay_enabled {
        return StatusCode::NO_CONTENT.into_response();
    }

    let Some(access_token) = state.session.ensure_access_token().await else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let upstream = match state.player.currently_playing(&access_token).await {
        Ok(upstream) => upstream,
        Err(e) => {
            error!("Spotify current error: {e}");
            return StatusCode::NO_CONTENT.into_response();
        }
    };
    discard_token_on_401(&state, &upstream).await;

    if upstream.status == StatusCode::NO_CONTENT {
        return Json(NowPlaying::idle()).into_response();
    }
    if !upstream.status.is_success() {
        return StatusCode::NO_CONTENT.into_response();
    }

    match NowPlaying::from_body(&upstream.body) {
        Ok(now_playing) => Json(now_playing).into_response(),
        Err(e) => {
            error!("Spotify current error: {e}");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

/// GET /spotify/player — Full playback state, relayed as JSON.
async fn spotify_player(State(state): State<SharedState>) -> Result<Response, DashboardError> {
    let access_token = state
        .session
        .ensure_access_token()
        .await
        .ok_or(DashboardError::Unauthorized)?;

    let upstream = state.player.player_state(&access_token).await?;
    discard_token_on_401(&state, &upstream).await;

    if upstream.status == StatusCode::NO_CONTENT || upstream.body.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: serde_json::Value = serde_json::from_slice(&upstream.body).map_err(|e| {
        error!(
            "Invalid JSON from Spotify /me/player: {}",
            String::from_utf8_lossy(&upstream.body)
        );
        DashboardError::InvalidResponse(format!("/me/player: {e}"))
    })?;

    Ok((upstream.status, Json(body)).into_response())
}

/// ANY /spotify/api/* — Forward to the Web API and relay the answer verbatim.
async fn spotify_proxy(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Response, DashboardError> {
    let access_token = state
        .session
        .ensure_access_token()
        .await
        .ok_or(DashboardError::Unauthorized)?;

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let upstream_path = path_and_query
        .strip_prefix(PROXY_PREFIX)
        .unwrap_or(path_and_query);

    let upstream = state
        .player
        .send(method, upstream_path, &access_token, Some(body))
        .await?;
    discard_token_on_401(&state, &upstream).await;

    Ok(relay(upstream))
}

async fn discard_token_on_401(state: &SharedState, upstream: &UpstreamResponse) {
    if upstream.status == StatusCode::UNAUTHORIZED {
        state.session.invalidate_access_token().await;
    }
}

fn relay(upstream: UpstreamResponse) -> Response {
    let mut resp = (upstream.status, upstream.body).into_response();
    match upstream.content_type {
        Some(content_type) => {
            resp.headers_mut().insert(header::CONTENT_TYPE, content_type);
        }
        None => {
            resp.headers_mut().remove(header::CONTENT_TYPE);
        }
    }
    resp
}
