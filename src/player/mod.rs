//! Spotify Web API client for the player endpoints and the generic proxy.

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Raw upstream answer, relayed to the dashboard unchanged.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

pub struct PlayerApi {
    base_url: String,
    http: reqwest::Client,
}

impl PlayerApi {
    pub fn new(base_url: String, http: reqwest::Client) -> Self {
        Self { base_url, http }
    }

    /// Send one request to `{base_url}{path_and_query}` with the bearer token.
    ///
    /// Bodies are only attached for methods other than GET and HEAD.
    pub async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        access_token: &str,
        body: Option<Bytes>,
    ) -> Result<UpstreamResponse, DashboardError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let carries_body = method != Method::GET && method != Method::HEAD;

        let mut req = self
            .http
            .request(method, &url)
            .bearer_auth(access_token)
            .header(header::CONTENT_TYPE, "application/json");
        if carries_body {
            req = req.body(body.unwrap_or_default());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DashboardError::ProviderError(format!("Spotify request failed: {e}")))?;

        let status = resp.status();
        let content_type = resp.headers().get(header::CONTENT_TYPE).cloned();
        let body = resp
            .bytes()
            .await
            .map_err(|e| DashboardError::ProviderError(format!("Spotify body unreadable: {e}")))?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }

    pub async fn player_state(&self, access_token: &str) -> Result<UpstreamResponse, DashboardError> {
        self.send(Method::GET, "/me/player", access_token, None).await
    }

    pub async fn currently_playing(
        &self,
        access_token: &str,
    ) -> Result<UpstreamResponse, DashboardError> {
        self.send(Method::GET, "/me/player/currently-playing", access_token, None)
            .await
    }
}

// =============================================================================
// Now-playing summary
// =============================================================================

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    progress_ms: Option<u64>,
    item: Option<PlayingItem>,
}

// Episodes have no artists or album, hence the defaults.
#[derive(Debug, Deserialize)]
struct PlayingItem {
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
    #[serde(default)]
    album: Album,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

/// Compact playback summary for the dashboard overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowPlaying {
    pub playing: bool,
    #[serde(flatten)]
    pub track: Option<TrackSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub is_playing: bool,
    pub track: String,
    pub artist: String,
    pub album_art: Option<String>,
    pub progress_ms: Option<u64>,
    pub duration_ms: u64,
}

impl NowPlaying {
    pub fn idle() -> Self {
        Self {
            playing: false,
            track: None,
        }
    }

    /// Summarize a `currently-playing` body. A body without an item is idle.
    pub fn from_body(body: &[u8]) -> Result<Self, DashboardError> {
        let current: CurrentlyPlaying = serde_json::from_slice(body)
            .map_err(|e| DashboardError::InvalidResponse(format!("currently-playing: {e}")))?;

        let Some(item) = current.item else {
            return Ok(Self::idle());
        };

        Ok(Self {
            playing: true,
            track: Some(TrackSummary {
                is_playing: current.is_playing,
                track: item.name,
                artist: item
                    .artists
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                album_art: item.album.images.into_iter().next().map(|i| i.url),
                progress_ms: current.progress_ms,
                duration_ms: item.duration_ms,
            }),
        })
    }
}
