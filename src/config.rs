use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Variables that must be present (and non-empty) at launch.
const REQUIRED_VARS: &[&str] = &[
    "SPOTIFY_CLIENT_ID",
    "SPOTIFY_REDIRECT_URI",
    "WEATHER_API_KEY",
    "WEATHER_LOCATION",
    "SYSTEM_OVERLAY_ENABLED",
    "REFRESH_BUTTON_ENABLED",
];

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    /// Directory holding the dashboard frontend bundle.
    pub static_dir: PathBuf,
    /// Plain-text file holding the Spotify refresh token.
    pub token_file: PathBuf,
    pub shutdown_command: Vec<String>,

    // ── Spotify ─────────────────────────────────────────────────────────
    pub spotify_client_id: String,
    pub spotify_redirect_uri: String,
    pub spotify_accounts_url: String,
    pub spotify_api_url: String,

    // ── Weather ─────────────────────────────────────────────────────────
    pub weather_api_key: String,
    pub weather_location: String,
    pub weather_api_url: String,

    // ── Dashboard ───────────────────────────────────────────────────────
    pub features: Features,
    pub display: DisplaySettings,
}

/// Toggles for the optional dashboard widgets.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub weather_enabled: bool,
    pub power_button_enabled: bool,
    pub refresh_button_enabled: bool,
    pub spotify_overlay_enabled: bool,
    pub system_overlay_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub timezone: String,
    pub locale: String,
    #[serde(rename = "time24h")]
    pub time_24h: bool,
    pub date_format: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        for &var in REQUIRED_VARS {
            if get(var).is_none() {
                anyhow::bail!("Missing required environment variable: {var}");
            }
        }
        let required = |key: &str| get(key).with_context(|| format!("{key} is required"));

        let flag = |key: &str, default: bool| match get(key) {
            Some(v) => v.eq_ignore_ascii_case("true"),
            None => default,
        };

        let shutdown_command: Vec<String> = get("SHUTDOWN_COMMAND")
            .unwrap_or_else(|| "sudo shutdown now".into())
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if shutdown_command.is_empty() {
            anyhow::bail!("SHUTDOWN_COMMAND must not be blank");
        }

        Ok(Config {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: get("PORT")
                .unwrap_or_else(|| "8888".into())
                .parse()
                .context("Invalid PORT")?,
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "public".into()).into(),
            token_file: get("TOKEN_FILE")
                .unwrap_or_else(|| "refresh_token.txt".into())
                .into(),
            shutdown_command,

            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_redirect_uri: required("SPOTIFY_REDIRECT_URI")?,
            spotify_accounts_url: trim_base(
                get("SPOTIFY_ACCOUNTS_URL")
                    .unwrap_or_else(|| "https://accounts.spotify.com".into()),
            ),
            spotify_api_url: trim_base(
                get("SPOTIFY_API_URL").unwrap_or_else(|| "https://api.spotify.com/v1".into()),
            ),

            weather_api_key: required("WEATHER_API_KEY")?,
            weather_location: required("WEATHER_LOCATION")?,
            weather_api_url: trim_base(
                get("WEATHER_API_URL").unwrap_or_else(|| "https://api.weatherapi.com/v1".into()),
            ),

            features: Features {
                weather_enabled: flag("WEATHER_ENABLED", true),
                power_button_enabled: flag("POWER_BUTTON_ENABLED", true),
                refresh_button_enabled: flag("REFRESH_BUTTON_ENABLED", true),
                spotify_overlay_enabled: flag("SPOTIFY_OVERLAY_ENABLED", true),
                system_overlay_enabled: flag("SYSTEM_OVERLAY_ENABLED", true),
            },
            display: DisplaySettings {
                timezone: get("TIMEZONE").unwrap_or_else(|| "Europe/London".into()),
                locale: get("LOCALE").unwrap_or_else(|| "en-GB".into()),
                time_24h: flag("TIME_24H", false),
                date_format: get("DATE_FORMAT").unwrap_or_else(|| "DD/MM/YYYY".into()),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
