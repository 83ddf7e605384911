//! Configuration loader for the `dashboard-backend` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Everything is read once at startup and handed to
//! the upstream clients, so no request ever touches the environment.
//!
//! Each upstream has its own section. A section whose required variables are
//! absent is recorded as [`MissingVar`] instead of aborting startup: that
//! source is reported unavailable on every request while the others keep
//! working. Variables that are present but malformed are fatal.
use std::{env, fmt, time::Duration};

use anyhow::{anyhow, Result};
use url::Url;

/// Parse an optional environment variable of type `$ty` with a default value.
macro_rules! parse_env {
    ($vars:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $vars($var_name)
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read a variable a section cannot work without.
///
/// Short-circuits the enclosing section loader with `Ok(Err(MissingVar))`.
macro_rules! require_env {
    ($vars:expr, $var_name:expr) => {
        match $vars($var_name) {
            Some(value) => value,
            None => return Ok(Err(MissingVar($var_name))),
        }
    };
}

pub const DEFAULT_CALENDAR_ID: &str = "kevin/kevin-shared";
pub const DEFAULT_OWM_BASE_URL: &str = "https://api.openweathermap.org";

/// Name of a required environment variable that was not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingVar(pub &'static str);

impl fmt::Display for MissingVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not set", self.0)
    }
}

/// A configuration section that is either usable or disabled for lack of a
/// required variable.
pub type Section<T> = std::result::Result<T, MissingVar>;

/// CalDAV connection settings.
#[derive(Debug, Clone)]
pub struct CalDavSettings {
    // ---
    /// Calendar collection URL (base URL joined with the calendar id).
    pub calendar_url: Url,

    /// Basic auth user name.
    pub username: Option<String>,

    /// Basic auth password.
    pub password: Option<String>,

    /// Length of the event window starting now.
    pub lookahead_months: u32,
}

/// OpenWeatherMap settings shared by the weather and air-quality fetchers.
#[derive(Debug, Clone)]
pub struct OpenWeatherSettings {
    // ---
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,

    /// Scheme and host the API paths are appended to.
    pub base_url: Url,

    /// Length N of the trailing air-quality window, in hours.
    pub pollution_window_hours: u32,
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Port the HTTP server listens on.
    pub port: u16,

    /// Timeout applied to every upstream request.
    pub upstream_timeout: Duration,

    pub caldav: Section<CalDavSettings>,

    pub openweather: Section<OpenWeatherSettings>,
}

/// Load configuration from environment variables with defaults.
///
/// Calendar (disabled when absent):
/// - `CALDAV_URL` – CalDAV server base URL
/// - `CALDAV_USERNAME`, `CALDAV_PASSWORD` – optional Basic auth credentials
/// - `CALENDAR_ID` – calendar path below the base URL (default: `kevin/kevin-shared`)
/// - `CALENDAR_LOOKAHEAD_MONTHS` – event window (default: 6)
///
/// Weather and air quality (disabled when any is absent):
/// - `OWM_API_KEY`, `LATITUDE`, `LONGITUDE`
/// - `OWM_BASE_URL` – provider base URL (default: `https://api.openweathermap.org`)
/// - `POLLUTION_WINDOW_HOURS` – trailing air-quality window (default: 24)
///
/// Server:
/// - `PORT` – listen port (default: 8080)
/// - `UPSTREAM_TIMEOUT_SECS` – per-request upstream timeout (default: 30)
///
/// Empty values count as unset. Returns an error if a present variable is
/// invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    load_from(|name| env::var(name).ok().filter(|v| !v.is_empty()))
}

/// Load configuration from an arbitrary variable lookup.
pub fn load_from<F>(vars: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let port = parse_env!(vars, "PORT", u16, 8080);
    let timeout_secs = parse_env!(vars, "UPSTREAM_TIMEOUT_SECS", u64, 30);

    Ok(Config {
        port,
        upstream_timeout: Duration::from_secs(timeout_secs),
        caldav: caldav_from(&vars)?,
        openweather: openweather_from(&vars)?,
    })
}

fn caldav_from<F>(vars: &F) -> Result<Section<CalDavSettings>>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let base_url = require_env!(vars, "CALDAV_URL");
    let calendar_id = vars("CALENDAR_ID").unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string());
    let lookahead_months = parse_env!(vars, "CALENDAR_LOOKAHEAD_MONTHS", u32, 6);

    Ok(Ok(CalDavSettings {
        calendar_url: resolve_calendar_url(&base_url, &calendar_id)?,
        username: vars("CALDAV_USERNAME"),
        password: vars("CALDAV_PASSWORD"),
        lookahead_months,
    }))
}

fn openweather_from<F>(vars: &F) -> Result<Section<OpenWeatherSettings>>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let api_key = require_env!(vars, "OWM_API_KEY");
    let latitude = require_env!(vars, "LATITUDE");
    let longitude = require_env!(vars, "LONGITUDE");

    let base_url = vars("OWM_BASE_URL").unwrap_or_else(|| DEFAULT_OWM_BASE_URL.to_string());
    let base_url = Url::parse(&base_url).map_err(|e| anyhow!("Invalid OWM_BASE_URL: {}", e))?;

    let pollution_window_hours = parse_env!(vars, "POLLUTION_WINDOW_HOURS", u32, 24);
    if pollution_window_hours == 0 {
        return Err(anyhow!("Invalid POLLUTION_WINDOW_HOURS: must be at least 1"));
    }

    Ok(Ok(OpenWeatherSettings {
        api_key,
        latitude: latitude
            .parse()
            .map_err(|e| anyhow!("Invalid LATITUDE: {}", e))?,
        longitude: longitude
            .parse()
            .map_err(|e| anyhow!("Invalid LONGITUDE: {}", e))?,
        base_url,
        pollution_window_hours,
    }))
}

/// Resolve the calendar id against the server URL.
///
/// Both are treated as collections, so the result always ends in `/`.
fn resolve_calendar_url(base: &str, calendar_id: &str) -> Result<Url> {
    // ---
    let base = as_collection(Url::parse(base).map_err(|e| anyhow!("Invalid CALDAV_URL: {}", e))?);
    let url = base
        .join(calendar_id)
        .map_err(|e| anyhow!("Invalid CALENDAR_ID '{}': {}", calendar_id, e))?;
    Ok(as_collection(url))
}

fn as_collection(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Hide all but the last four characters of a secret.
fn mask_secret(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() > 8 {
        format!("****{}", visible)
    } else {
        "****".to_string()
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the API key and CalDAV password. A disabled section is logged as
    /// a warning naming the missing variable.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  PORT                   : {}", self.port);
        tracing::info!("  UPSTREAM_TIMEOUT_SECS  : {}", self.upstream_timeout.as_secs());

        match &self.caldav {
            Ok(caldav) => {
                tracing::info!("  CALENDAR_URL           : {}", caldav.calendar_url);
                tracing::info!(
                    "  CALDAV_USERNAME        : {}",
                    caldav.username.as_deref().unwrap_or("<none>")
                );
                tracing::info!(
                    "  CALDAV_PASSWORD        : {}",
                    caldav.password.as_deref().map_or("<none>".to_string(), mask_secret)
                );
                tracing::info!("  LOOKAHEAD_MONTHS       : {}", caldav.lookahead_months);
            }
            Err(missing) => {
                tracing::warn!("Calendar source disabled: {}", missing);
            }
        }

        match &self.openweather {
            Ok(owm) => {
                tracing::info!("  OWM_BASE_URL           : {}", owm.base_url);
                tracing::info!("  OWM_API_KEY            : {}", mask_secret(&owm.api_key));
                tracing::info!("  LATITUDE / LONGITUDE   : {} / {}", owm.latitude, owm.longitude);
                tracing::info!("  POLLUTION_WINDOW_HOURS : {}", owm.pollution_window_hours);
            }
            Err(missing) => {
                tracing::warn!("Weather and air quality sources disabled: {}", missing);
            }
        }
    }
}
