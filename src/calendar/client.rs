//! HTTP side of the calendar fetcher.

use chrono::{DateTime, Months, Utc};
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, trace};

use crate::config::CalDavSettings;
use crate::error::{FetchError, FetchResult, Upstream};
use crate::Event;

use super::{ics, xml};

/// Client for the single shared calendar collection.
#[derive(Debug, Clone)]
pub struct CalDavClient {
    http: Client,
    settings: CalDavSettings,
}

impl CalDavClient {
    pub fn new(http: Client, settings: CalDavSettings) -> Self {
        Self { http, settings }
    }

    /// Fetch every occurrence between `now` and `now + lookahead_months`.
    pub async fn fetch_events(&self, now: DateTime<Utc>) -> FetchResult<Vec<Event>> {
        // ---
        let end = now
            .checked_add_months(Months::new(self.settings.lookahead_months))
            .ok_or_else(|| {
                FetchError::malformed(Upstream::Calendar, "event window end out of range")
            })?;

        let mut events = Vec::new();
        for blob in self.search(now, end).await? {
            events.extend(ics::parse_events(&blob, now, end)?);
        }

        debug!(count = events.len(), "Parsed calendar events");
        Ok(events)
    }

    /// Run an expanding `calendar-query` REPORT and return the raw
    /// `calendar-data` payloads.
    pub async fn search(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> FetchResult<Vec<String>> {
        // ---
        let url = self.settings.calendar_url.as_str();
        let body = xml::calendar_query_body(start, end)?;

        let report = Method::from_bytes(b"REPORT")
            .map_err(|e| FetchError::malformed(Upstream::Calendar, e))?;

        let mut request = self
            .http
            .request(report, url)
            .header("Depth", "1")
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(body);

        if let Some(username) = &self.settings.username {
            request = request.basic_auth(username, self.settings.password.as_ref());
        }

        trace!(url = %url, %start, %end, "Sending calendar-query REPORT");

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::transport(Upstream::Calendar, e))?;

        let status = response.status();
        if status != StatusCode::MULTI_STATUS && status != StatusCode::OK {
            return Err(FetchError::Status {
                upstream: Upstream::Calendar,
                status,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::transport(Upstream::Calendar, e))?;

        let blobs = xml::parse_multistatus(&text)?;
        debug!(url = %url, resources = blobs.len(), "calendar-query answered");
        Ok(blobs)
    }
}
