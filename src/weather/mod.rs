//! Current conditions from weatherapi.com, reduced to what the widget shows.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::DashboardError;

pub struct WeatherClient {
    base_url: String,
    api_key: String,
    location: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
    feelslike_c: f64,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub temp_c: i64,
    pub feelslike_c: i64,
    pub condition_text: String,
    pub condition_emoji: &'static str,
}

impl WeatherClient {
    pub fn new(base_url: String, api_key: String, location: String, http: reqwest::Client) -> Self {
        Self {
            base_url,
            api_key,
            location,
            http,
        }
    }

    /// Fetch current conditions. Every failure collapses to `WeatherUnavailable`.
    pub async fn current(&self) -> Result<WeatherReport, DashboardError> {
        self.fetch().await.map_err(|e| {
            error!("Weather error: {}", redact(e));
            DashboardError::WeatherUnavailable
        })
    }

    async fn fetch(&self) -> Result<WeatherReport, reqwest::Error> {
        let data: CurrentResponse = self
            .http
            .get(format!("{}/current.json", self.base_url))
            .query(&[("key", &self.api_key), ("q", &self.location)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = data.current.condition.text;
        Ok(WeatherReport {
            temp_c: data.current.temp_c.round() as i64,
            feelslike_c: data.current.feelslike_c.round() as i64,
            condition_emoji: condition_emoji(&text),
            condition_text: text,
        })
    }
}

// The request URL carries the API key in its query string.
fn redact(e: reqwest::Error) -> reqwest::Error {
    e.without_url()
}

/// Pick an emoji for a free-text condition. Earlier matches win.
pub fn condition_emoji(text: &str) -> &'static str {
    let t = text.to_lowercase();
    let has = |needle: &str| t.contains(needle);

    if has("rain") {
        "🌧️"
    } else if has("cloud") {
        "☁️"
    } else if has("sun") || has("clear") {
        "☀️"
    } else if has("snow") {
        "❄️"
    } else if has("storm") || has("thunder") {
        "⛈️"
    } else if has("fog") || has("mist") {
        "🌫️"
    } else {
        "🌡️"
    }
}
