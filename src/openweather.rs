//! OpenWeatherMap fetchers: One Call 3.0 weather and air pollution history.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::OpenWeatherSettings;
use crate::error::{FetchError, FetchResult, Upstream};
use crate::models::RawOneCall;
use crate::WeatherSnapshot;

pub const ONECALL_PATH: &str = "/data/3.0/onecall";
pub const AIR_POLLUTION_HISTORY_PATH: &str = "/data/2.5/air_pollution/history";

/// Client for both OpenWeatherMap endpoints; they share key and coordinates.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: Client,
    settings: OpenWeatherSettings,
}

impl OpenWeatherClient {
    pub fn new(http: Client, settings: OpenWeatherSettings) -> Self {
        Self { http, settings }
    }

    /// Fetch current conditions, the daily forecast and alerts.
    ///
    /// Any non-2xx status is an error. The body is reshaped into a
    /// [`WeatherSnapshot`]; a missing required field fails the fetch.
    pub async fn fetch_weather(&self) -> FetchResult<WeatherSnapshot> {
        // ---
        let url = self.endpoint(ONECALL_PATH, Upstream::Weather)?;
        let lat = self.settings.latitude.to_string();
        let lon = self.settings.longitude.to_string();

        let response = self
            .http
            .get(url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.settings.api_key.as_str()),
                ("lang", "en"),
                ("units", "standard"),
                ("exclude", "minutely,hourly"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::transport(Upstream::Weather, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                upstream: Upstream::Weather,
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::transport(Upstream::Weather, e))?;

        let snapshot = RawOneCall::from_json(&body)
            .map_err(|e| FetchError::malformed(Upstream::Weather, e))?
            .into_snapshot();

        debug!(days = snapshot.daily.len(), alerts = snapshot.alerts.len(), "Weather reshaped");
        Ok(snapshot)
    }

    /// Fetch hourly air-quality records for the trailing window ending at
    /// `now`, returned exactly as the provider sent them.
    pub async fn fetch_air_pollution(&self, now: DateTime<Utc>) -> FetchResult<Value> {
        // ---
        let url = self.endpoint(AIR_POLLUTION_HISTORY_PATH, Upstream::AirPollution)?;
        let (start, end) = pollution_window(now.timestamp(), self.settings.pollution_window_hours);

        let response = self
            .http
            .get(url)
            .query(&[
                ("lat", self.settings.latitude.to_string()),
                ("lon", self.settings.longitude.to_string()),
                ("appid", self.settings.api_key.clone()),
                ("start", start.to_string()),
                ("end", end.to_string()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::transport(Upstream::AirPollution, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                upstream: Upstream::AirPollution,
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::transport(Upstream::AirPollution, e))?;

        debug!(start, end, "Air pollution history fetched");
        serde_json::from_str(&body).map_err(|e| FetchError::malformed(Upstream::AirPollution, e))
    }

    fn endpoint(&self, path: &str, upstream: Upstream) -> FetchResult<url::Url> {
        self.settings
            .base_url
            .join(path)
            .map_err(|e| FetchError::malformed(upstream, e))
    }
}

/// Trailing window of `hours` hours ending at `end`, both bounds inclusive:
/// `start = end - (hours * 3600 - 1)`.
pub fn pollution_window(end: i64, hours: u32) -> (i64, i64) {
    let span = i64::from(hours) * 3600 - 1;
    (end - span, end)
}
