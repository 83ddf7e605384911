//! Mock upstream server for in-crate tests.
//!
//! One axum app on an ephemeral port stands in for both the CalDAV server and
//! OpenWeatherMap, answering each path with a canned response and recording
//! every request it sees.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Router,
};
use serde_json::{json, Value};
use url::Url;

use crate::config::{CalDavSettings, Config, OpenWeatherSettings};
use crate::models::tests::sample_onecall;
use crate::openweather::{AIR_POLLUTION_HISTORY_PATH, ONECALL_PATH};

pub const CALENDAR_PATH: &str = "/dav/kevin/kevin-shared/";

// ---

#[derive(Debug, Clone)]
pub struct Canned {
    pub status: StatusCode,
    pub body: String,
}

impl Canned {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct MockUpstream {
    pub calendar: Canned,
    pub onecall: Canned,
    pub air_pollution: Canned,
}

struct MockState {
    upstream: MockUpstream,
    seen: Mutex<Vec<Recorded>>,
}

pub struct RunningMock {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockUpstream {
    /// Every source answers successfully; the calendar serves `ics`.
    pub fn healthy(ics: &[&str]) -> Self {
        Self {
            calendar: Canned {
                status: StatusCode::MULTI_STATUS,
                body: multistatus(ics),
            },
            onecall: Canned::ok(sample_onecall().to_string()),
            air_pollution: Canned::ok(sample_pollution().to_string()),
        }
    }

    pub async fn start(self) -> RunningMock {
        let state = Arc::new(MockState {
            upstream: self,
            seen: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(respond).with_state(state.clone());
        let addr = serve(app).await;

        RunningMock {
            base_url: format!("http://{}", addr),
            state,
        }
    }
}

impl RunningMock {
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.seen.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn caldav_settings(&self) -> CalDavSettings {
        CalDavSettings {
            calendar_url: Url::parse(&format!("{}{}", self.base_url, CALENDAR_PATH)).unwrap(),
            username: Some("kevin".to_string()),
            password: Some("secret".to_string()),
            lookahead_months: 6,
        }
    }

    pub fn openweather_settings(&self) -> OpenWeatherSettings {
        OpenWeatherSettings {
            api_key: "test-key".to_string(),
            latitude: 52.37,
            longitude: 4.89,
            base_url: Url::parse(&self.base_url).unwrap(),
            pollution_window_hours: 24,
        }
    }

    /// Configuration with both sections pointing at this mock.
    pub fn config(&self) -> Config {
        Config {
            port: 0,
            upstream_timeout: Duration::from_secs(5),
            caldav: Ok(self.caldav_settings()),
            openweather: Ok(self.openweather_settings()),
        }
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Wrap iCalendar payloads in a CalDAV `207 Multi-Status` body.
pub fn multistatus(ics: &[&str]) -> String {
    let responses: String = ics
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let escaped = data
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            format!(
                "<d:response><d:href>{CALENDAR_PATH}{i}.ics</d:href><d:propstat><d:prop>\
                 <d:getetag>\"{i}\"</d:getetag><cal:calendar-data>{escaped}</cal:calendar-data>\
                 </d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>"
            )
        })
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <d:multistatus xmlns:d=\"DAV:\" xmlns:cal=\"urn:ietf:params:xml:ns:caldav\">{}</d:multistatus>",
        responses
    )
}

pub fn sample_pollution() -> Value {
    json!({
        "coord": { "lon": 4.89, "lat": 52.37 },
        "list": [
            {
                "dt": 1704067200,
                "main": { "aqi": 2 },
                "components": { "co": 230.31, "no": 0.0, "no2": 18.17, "o3": 41.84, "so2": 1.86, "pm2_5": 6.2, "pm10": 8.45, "nh3": 0.52 }
            },
            {
                "dt": 1704070800,
                "main": { "aqi": 1 },
                "components": { "co": 226.97, "no": 0.0, "no2": 16.45, "o3": 45.42, "so2": 1.62, "pm2_5": 5.1, "pm10": 7.02, "nh3": 0.41 }
            }
        ]
    })
}

async fn respond(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let query = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    state.seen.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        query,
        headers,
        body,
    });

    let canned = match uri.path() {
        CALENDAR_PATH => &state.upstream.calendar,
        ONECALL_PATH => &state.upstream.onecall,
        AIR_POLLUTION_HISTORY_PATH => &state.upstream.air_pollution,
        _ => return (StatusCode::NOT_FOUND, String::new()),
    };
    (canned.status, canned.body.clone())
}
