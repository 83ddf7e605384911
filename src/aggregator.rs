//! The three upstream sources, built once at startup and shared with the
//! routes as axum state.

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::calendar::CalDavClient;
use crate::config::Section;
use crate::error::{FetchError, FetchResult, Upstream};
use crate::openweather::OpenWeatherClient;
use crate::{CombinedResponse, Config, Event, WeatherSnapshot};

// ---

#[derive(Debug, Clone)]
pub struct Aggregator {
    // ---
    calendar: Section<CalDavClient>,
    weather: Section<OpenWeatherClient>,
}

impl Aggregator {
    /// Build the clients from configuration; disabled sections stay disabled.
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        // ---
        Self {
            calendar: config
                .caldav
                .clone()
                .map(|settings| CalDavClient::new(http.clone(), settings)),
            weather: config
                .openweather
                .clone()
                .map(|settings| OpenWeatherClient::new(http, settings)),
        }
    }

    pub async fn fetch_events(&self) -> FetchResult<Vec<Event>> {
        let client = self
            .calendar
            .as_ref()
            .map_err(|missing| FetchError::Configuration(missing.0))?;
        client.fetch_events(Utc::now()).await
    }

    pub async fn fetch_weather(&self) -> FetchResult<WeatherSnapshot> {
        let client = self
            .weather
            .as_ref()
            .map_err(|missing| FetchError::Configuration(missing.0))?;
        client.fetch_weather().await
    }

    pub async fn fetch_air_pollution(&self) -> FetchResult<Value> {
        let client = self
            .weather
            .as_ref()
            .map_err(|missing| FetchError::Configuration(missing.0))?;
        client.fetch_air_pollution(Utc::now()).await
    }

    /// Run the three fetches in turn.
    ///
    /// A failing source is logged and left at its empty default; it never
    /// affects the other two.
    pub async fn combined(&self) -> CombinedResponse {
        // ---
        let mut response = CombinedResponse::default();

        match self.fetch_events().await {
            Ok(events) => response.events = events,
            Err(e) => warn!(
                source = %Upstream::Calendar,
                status = ?e.status(),
                "could not fetch calendar events: {}", e
            ),
        }

        match self.fetch_weather().await.and_then(snapshot_to_value) {
            Ok(weather) => response.weather_data = weather,
            Err(e) => warn!(
                source = %Upstream::Weather,
                status = ?e.status(),
                "could not fetch weather data: {}", e
            ),
        }

        match self.fetch_air_pollution().await {
            Ok(pollution) => response.air_pollution = pollution,
            Err(e) => warn!(
                source = %Upstream::AirPollution,
                status = ?e.status(),
                "could not fetch air pollution data: {}", e
            ),
        }

        info!(
            events = response.events.len(),
            weather = !is_empty_object(&response.weather_data),
            "Combined response assembled"
        );
        response
    }
}

fn snapshot_to_value(snapshot: WeatherSnapshot) -> FetchResult<Value> {
    serde_json::to_value(snapshot)
        .map_err(|e| FetchError::malformed(Upstream::Weather, e))
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(|map| map.is_empty())
}
