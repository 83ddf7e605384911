//! Data models for the combined dashboard response.
//!
//! `Raw*` types mirror the OpenWeatherMap One Call payload; the public types
//! are the reduced shape served to the display. Required provider fields are
//! plain fields, so a missing one fails deserialization. Optional numeric
//! fields carry `#[serde(default)]` and come out as 0.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---

/// One calendar occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    // ---
    pub summary: Option<String>,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Body of `GET /api/combined`.
#[derive(Debug, Serialize)]
pub struct CombinedResponse {
    // ---
    pub events: Vec<Event>,
    /// Serialized [`WeatherSnapshot`], or `{}` when unavailable.
    pub weather_data: Value,
    /// Provider body passed through, or `[]` when unavailable.
    pub air_pollution: Value,
}

impl Default for CombinedResponse {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            weather_data: Value::Object(Default::default()),
            air_pollution: Value::Array(Vec::new()),
        }
    }
}

/// Reduced weather payload.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherSnapshot {
    // ---
    pub current: CurrentWeather,
    pub daily: Vec<DailyForecast>,
    pub alerts: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentWeather {
    // ---
    pub sunrise: i64,
    pub sunset: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: i64,
    pub humidity: i64,
    pub dew_point: f64,
    pub clouds: i64,
    pub uvi: f64,
    pub visibility: i64,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub wind_deg: i64,
    pub rain_1h: f64,
    pub snow_1h: f64,
    pub weather: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyForecast {
    // ---
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub moonrise: i64,
    pub moonset: i64,
    pub moon_phase: f64,
    /// Provider's per-period temperature object, passed through.
    pub temp: Value,
    pub feels_like: Value,
    pub pressure: i64,
    pub humidity: i64,
    pub dew_point: f64,
    pub clouds: i64,
    pub uvi: f64,
    pub visibility: i64,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub wind_deg: i64,
    pub pop: f64,
    pub rain: f64,
    pub snow: f64,
    pub weather: Vec<Value>,
}

/// One Call 3.0 response, restricted to the blocks we read.
#[derive(Debug, Deserialize)]
pub struct RawOneCall {
    // ---
    pub current: RawCurrent,
    pub daily: Vec<RawDaily>,
    #[serde(default)]
    pub alerts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawCurrent {
    // ---
    pub sunrise: i64,
    pub sunset: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: i64,
    pub humidity: i64,
    pub dew_point: f64,
    pub clouds: i64,
    pub uvi: f64,
    #[serde(default)]
    pub visibility: i64,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_gust: f64,
    #[serde(default)]
    pub wind_deg: i64,
    #[serde(default)]
    pub rain: RawVolume,
    #[serde(default)]
    pub snow: RawVolume,
    pub weather: Vec<Value>,
}

/// Precipitation block of the current conditions, e.g. `{"1h": 0.25}`.
#[derive(Debug, Default, Deserialize)]
pub struct RawVolume {
    // ---
    #[serde(rename = "1h", default)]
    pub one_hour: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawDaily {
    // ---
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub moonrise: i64,
    pub moonset: i64,
    pub moon_phase: f64,
    pub temp: Value,
    pub feels_like: Value,
    pub pressure: i64,
    pub humidity: i64,
    pub dew_point: f64,
    pub clouds: i64,
    pub uvi: f64,
    #[serde(default)]
    pub visibility: i64,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_gust: f64,
    #[serde(default)]
    pub wind_deg: i64,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub rain: f64,
    #[serde(default)]
    pub snow: f64,
    pub weather: Vec<Value>,
}

/// Reshaping helpers
impl RawOneCall {
    // ---
    /// Decode a provider body, failing on any missing required field.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn into_snapshot(self) -> WeatherSnapshot {
        // ---
        WeatherSnapshot {
            current: self.current.into_current(),
            daily: self.daily.into_iter().map(RawDaily::into_forecast).collect(),
            alerts: self.alerts,
        }
    }
}

impl RawCurrent {
    fn into_current(self) -> CurrentWeather {
        CurrentWeather {
            sunrise: self.sunrise,
            sunset: self.sunset,
            temp: self.temp,
            feels_like: self.feels_like,
            pressure: self.pressure,
            humidity: self.humidity,
            dew_point: self.dew_point,
            clouds: self.clouds,
            uvi: self.uvi,
            visibility: self.visibility,
            wind_speed: self.wind_speed,
            wind_gust: self.wind_gust,
            wind_deg: self.wind_deg,
            rain_1h: self.rain.one_hour,
            snow_1h: self.snow.one_hour,
            weather: self.weather,
        }
    }
}

impl RawDaily {
    fn into_forecast(self) -> DailyForecast {
        DailyForecast {
            dt: self.dt,
            sunrise: self.sunrise,
            sunset: self.sunset,
            moonrise: self.moonrise,
            moonset: self.moonset,
            moon_phase: self.moon_phase,
            temp: self.temp,
            feels_like: self.feels_like,
            pressure: self.pressure,
            humidity: self.humidity,
            dew_point: self.dew_point,
            clouds: self.clouds,
            uvi: self.uvi,
            visibility: self.visibility,
            wind_speed: self.wind_speed,
            wind_gust: self.wind_gust,
            wind_deg: self.wind_deg,
            pop: self.pop,
            rain: self.rain,
            snow: self.snow,
            weather: self.weather,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    // ---
    use super::*;
    use serde_json::json;

    pub(crate) fn sample_current() -> Value {
        // ---
        json!({
            "dt": 1704103200,
            "sunrise": 1704094800,
            "sunset": 1704123000,
            "temp": 278.4,
            "feels_like": 275.1,
            "pressure": 1012,
            "humidity": 87,
            "dew_point": 276.3,
            "uvi": 0.4,
            "clouds": 75,
            "visibility": 10000,
            "wind_speed": 4.6,
            "wind_gust": 9.1,
            "wind_deg": 230,
            "rain": { "1h": 0.25 },
            "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }]
        })
    }

    pub(crate) fn sample_daily(dt: i64) -> Value {
        // ---
        json!({
            "dt": dt,
            "sunrise": dt - 10800,
            "sunset": dt + 18000,
            "moonrise": dt + 3600,
            "moonset": dt - 3600,
            "moon_phase": 0.68,
            "temp": { "day": 279.1, "min": 274.2, "max": 280.0, "night": 275.0, "eve": 277.4, "morn": 274.9 },
            "feels_like": { "day": 276.0, "night": 272.1, "eve": 274.3, "morn": 271.8 },
            "pressure": 1010,
            "humidity": 80,
            "dew_point": 275.9,
            "wind_speed": 6.2,
            "wind_deg": 240,
            "clouds": 100,
            "pop": 0.86,
            "rain": 3.1,
            "uvi": 0.6,
            "weather": [{ "id": 501, "main": "Rain", "description": "moderate rain", "icon": "10d" }]
        })
    }

    pub(crate) fn sample_onecall() -> Value {
        // ---
        json!({
            "lat": 52.37,
            "lon": 4.89,
            "timezone": "Europe/Amsterdam",
            "timezone_offset": 3600,
            "current": sample_current(),
            "daily": [sample_daily(1704106800), sample_daily(1704193200)]
        })
    }

    fn reshape(body: &Value) -> Result<WeatherSnapshot, serde_json::Error> {
        RawOneCall::from_json(&body.to_string()).map(RawOneCall::into_snapshot)
    }

    #[test]
    fn test_required_fields_are_copied() {
        // ---
        let snapshot = reshape(&sample_onecall()).unwrap();

        assert_eq!(snapshot.current.sunrise, 1704094800);
        assert_eq!(snapshot.current.temp, 278.4);
        assert_eq!(snapshot.current.pressure, 1012);
        assert_eq!(snapshot.current.weather[0]["main"], "Rain");
        assert_eq!(snapshot.current.rain_1h, 0.25);
        assert_eq!(snapshot.current.snow_1h, 0.0);
    }

    #[test]
    fn test_missing_wind_speed_defaults_to_zero() {
        // ---
        let mut body = sample_onecall();
        let current = body["current"].as_object_mut().unwrap();
        current.remove("wind_speed");
        current.remove("wind_gust");
        current.remove("wind_deg");
        current.remove("visibility");
        current.remove("rain");

        let snapshot = reshape(&body).unwrap();

        assert_eq!(snapshot.current.wind_speed, 0.0);
        assert_eq!(snapshot.current.wind_gust, 0.0);
        assert_eq!(snapshot.current.wind_deg, 0);
        assert_eq!(snapshot.current.visibility, 0);
        assert_eq!(snapshot.current.rain_1h, 0.0);
    }

    #[test]
    fn test_missing_required_current_field_fails() {
        // ---
        let mut body = sample_onecall();
        body["current"].as_object_mut().unwrap().remove("temp");

        let err = reshape(&body).unwrap_err();
        assert!(err.to_string().contains("missing field `temp`"), "{err}");
    }

    #[test]
    fn test_missing_daily_block_fails() {
        // ---
        let mut body = sample_onecall();
        body.as_object_mut().unwrap().remove("daily");

        assert!(reshape(&body).is_err());
    }

    #[test]
    fn test_daily_optional_fields_default_and_order_is_kept() {
        // ---
        let snapshot = reshape(&sample_onecall()).unwrap();

        assert_eq!(snapshot.daily.len(), 2);
        assert_eq!(snapshot.daily[0].dt, 1704106800);
        assert_eq!(snapshot.daily[1].dt, 1704193200);

        // sample_daily has no gust, visibility or snow
        let first = &snapshot.daily[0];
        assert_eq!(first.wind_gust, 0.0);
        assert_eq!(first.visibility, 0);
        assert_eq!(first.snow, 0.0);
        assert_eq!(first.pop, 0.86);
        assert_eq!(first.rain, 3.1);
        assert_eq!(first.temp["max"], 280.0);
    }

    #[test]
    fn test_alerts_default_to_empty() {
        // ---
        let snapshot = reshape(&sample_onecall()).unwrap();
        assert!(snapshot.alerts.is_empty());

        let mut body = sample_onecall();
        body["alerts"] = json!([{ "event": "Wind warning", "start": 1704100000, "end": 1704150000 }]);
        let snapshot = reshape(&body).unwrap();
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0]["event"], "Wind warning");
    }

    #[test]
    fn test_event_serialization() {
        // ---
        let with_end = Event {
            summary: Some("Meeting".to_string()),
            start: "2024-01-01 10:00".to_string(),
            end: Some("2024-01-01 11:00".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&with_end).unwrap(),
            json!({ "summary": "Meeting", "start": "2024-01-01 10:00", "end": "2024-01-01 11:00" })
        );

        let open_ended = Event {
            summary: None,
            start: "2024-01-01 10:00".to_string(),
            end: None,
        };
        assert_eq!(
            serde_json::to_value(&open_ended).unwrap(),
            json!({ "summary": null, "start": "2024-01-01 10:00" })
        );
    }

    #[test]
    fn test_empty_combined_response() {
        // ---
        let body = serde_json::to_value(CombinedResponse::default()).unwrap();
        assert_eq!(
            body,
            json!({ "events": [], "weather_data": {}, "air_pollution": [] })
        );
    }
}
