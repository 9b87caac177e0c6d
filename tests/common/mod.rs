//! Shared fixtures: a wiremock upstream standing in for Spotify and
//! weatherapi.com, a temp dir for the token file, and a router wired to both.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;

use wallboard::{api, AppState, Config, SharedState};

pub struct Harness {
    pub server: MockServer,
    pub dir: TempDir,
    pub state: SharedState,
}

impl Harness {
    pub async fn new(stored_refresh_token: Option<&str>) -> Self {
        Self::with_env(stored_refresh_token, &[]).await
    }

    pub async fn with_env(stored_refresh_token: Option<&str>, overrides: &[(&str, &str)]) -> Self {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("refresh_token.txt");
        if let Some(token) = stored_refresh_token {
            std::fs::write(&token_file, token).unwrap();
        }
        std::fs::create_dir_all(dir.path().join("public")).unwrap();

        let mut env: HashMap<String, String> = [
            ("SPOTIFY_CLIENT_ID", "client-123".to_string()),
            ("SPOTIFY_REDIRECT_URI", "http://127.0.0.1:8888/callback".to_string()),
            ("WEATHER_API_KEY", "weather-key".to_string()),
            ("WEATHER_LOCATION", "London".to_string()),
            ("SYSTEM_OVERLAY_ENABLED", "true".to_string()),
            ("REFRESH_BUTTON_ENABLED", "true".to_string()),
            ("SPOTIFY_ACCOUNTS_URL", server.uri()),
            ("SPOTIFY_API_URL", format!("{}/v1", server.uri())),
            ("WEATHER_API_URL", format!("{}/weather/v1", server.uri())),
            ("TOKEN_FILE", token_file.display().to_string()),
            ("STATIC_DIR", dir.path().join("public").display().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        for (k, v) in overrides {
            env.insert(k.to_string(), v.to_string());
        }

        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        let state = AppState::build(config).await.unwrap();

        Self { server, dir, state }
    }

    pub fn token_file(&self) -> PathBuf {
        self.dir.path().join("refresh_token.txt")
    }

    pub fn stored_token(&self) -> Option<String> {
        std::fs::read_to_string(self.token_file()).ok()
    }

    /// Router as seen by a client on the loopback interface.
    pub fn app(&self) -> Router {
        self.app_from(SocketAddr::from(([127, 0, 0, 1], 40000)))
    }

    pub fn app_from(&self, peer: SocketAddr) -> Router {
        api::router(self.state.clone()).layer(MockConnectInfo(peer))
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

/// Base URL of a local port with nothing listening on it.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn token_body(access_token: &str, refresh_token: Option<&str>, expires_in: u64) -> Value {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "scope": "user-read-playback-state",
        "expires_in": expires_in,
    });
    if let Some(rt) = refresh_token {
        body["refresh_token"] = Value::String(rt.to_string());
    }
    body
}
