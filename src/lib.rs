pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod player;
pub mod providers;
pub mod session;
pub mod system;
pub mod weather;

pub use config::Config;
pub use error::DashboardError;

use std::sync::Arc;
use std::time::Duration;

use player::PlayerApi;
use providers::SpotifyProvider;
use session::{TokenFile, TokenManager};
use system::CpuTracker;
use weather::WeatherClient;

/// Upper bound on every upstream call.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub session: TokenManager,
    pub player: PlayerApi,
    pub weather: WeatherClient,
    pub cpu: CpuTracker,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire up clients and load the persisted session.
    pub async fn build(config: Config) -> Result<SharedState, DashboardError> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .map_err(|e| DashboardError::Internal(format!("HTTP client init failed: {e}")))?;

        let provider = SpotifyProvider::new(
            config.spotify_client_id.clone(),
            config.spotify_redirect_uri.clone(),
            config.spotify_accounts_url.clone(),
            http.clone(),
        );
        let session =
            TokenManager::load(Arc::new(provider), TokenFile::new(&config.token_file)).await?;

        let player = PlayerApi::new(config.spotify_api_url.clone(), http.clone());
        let weather = WeatherClient::new(
            config.weather_api_url.clone(),
            config.weather_api_key.clone(),
            config.weather_location.clone(),
            http,
        );

        Ok(Arc::new(AppState {
            config,
            session,
            player,
            weather,
            cpu: CpuTracker::new(),
        }))
    }
}
