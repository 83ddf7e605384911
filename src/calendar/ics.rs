//! iCalendar parsing: VEVENT components to [`Event`]s.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, Utc};
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime};

use super::recurrence;
use crate::error::{FetchError, FetchResult, Upstream};
use crate::Event;

/// Display format for event start and end.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// iCalendar `DATE-TIME` value without the trailing `Z`.
pub const ICAL_DATE_TIME: &str = "%Y%m%dT%H%M%S";

/// Parse one `calendar-data` payload and return an [`Event`] for every VEVENT
/// occurrence in it.
///
/// After server-side expansion a recurring definition arrives as one VEVENT
/// per occurrence, so each occurrence becomes its own entry. A master VEVENT
/// that still carries an RRULE is expanded here over `window_start..window_end`,
/// skipping occurrences that have their own RECURRENCE-ID override. Other
/// component types (VTODO, VTIMEZONE, ...) are skipped.
pub fn parse_events(
    ics: &str,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> FetchResult<Vec<Event>> {
    // ---
    let calendar: Calendar = terminated(ics)
        .parse()
        .map_err(|e| FetchError::malformed(Upstream::Calendar, e))?;

    let vevents: Vec<&icalendar::Event> = calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => Some(event),
            _ => None,
        })
        .collect();

    let overridden: HashSet<(&str, NaiveDateTime)> = vevents
        .iter()
        .filter_map(|event| {
            Some((event.get_uid()?, local_naive(&event.get_recurrence_id()?)))
        })
        .collect();

    let mut events = Vec::new();
    for event in vevents {
        let start = start_of(event)?;
        let span = span_of(event, &start)?;
        let summary = event.get_summary().map(str::to_string);

        if !recurrence::is_master(event) {
            events.push(event_at(summary, local_naive(&start), span));
            continue;
        }

        let uid = event.get_uid().unwrap_or_default();
        events.extend(
            recurrence::occurrences(event, &start, span, window_start, window_end)
                .into_iter()
                .filter(|occurrence| !overridden.contains(&(uid, *occurrence)))
                .map(|occurrence| event_at(summary.clone(), occurrence, span)),
        );
    }
    Ok(events)
}

/// Every content line must be terminated, including `END:VCALENDAR`, using
/// the line ending the payload already uses.
fn terminated(ics: &str) -> String {
    // ---
    if ics.ends_with('\n') {
        ics.to_string()
    } else if ics.contains("\r\n") {
        format!("{}\r\n", ics)
    } else {
        format!("{}\n", ics)
    }
}

fn start_of(event: &icalendar::Event) -> FetchResult<DatePerhapsTime> {
    event.get_start().ok_or_else(|| {
        FetchError::malformed(
            Upstream::Calendar,
            format!(
                "VEVENT {} has no DTSTART",
                event.get_uid().unwrap_or("<no uid>")
            ),
        )
    })
}

/// Length of one occurrence: DTEND minus DTSTART, else DURATION, else unknown.
fn span_of(event: &icalendar::Event, start: &DatePerhapsTime) -> FetchResult<Option<Duration>> {
    // ---
    if let Some(end) = event.get_end() {
        return Ok(Some(local_naive(&end) - local_naive(start)));
    }
    match event.property_value("DURATION") {
        None => Ok(None),
        Some(raw) => parse_duration(raw).map(Some).ok_or_else(|| {
            FetchError::malformed(Upstream::Calendar, format!("invalid DURATION {:?}", raw))
        }),
    }
}

fn event_at(summary: Option<String>, start: NaiveDateTime, span: Option<Duration>) -> Event {
    Event {
        summary,
        start: start.format(EVENT_TIME_FORMAT).to_string(),
        end: span.map(|span| (start + span).format(EVENT_TIME_FORMAT).to_string()),
    }
}

/// An iCalendar time as local wall-clock time.
///
/// UTC instants are converted to the process time zone. Floating times are
/// printed as written, and so are TZID-qualified times: the wall-clock time in
/// the event's own zone is shown without converting it. All-day dates map to
/// midnight.
pub fn local_naive(value: &DatePerhapsTime) -> NaiveDateTime {
    match value {
        DatePerhapsTime::Date(date) => date.and_time(NaiveTime::MIN),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => {
            dt.with_timezone(&Local).naive_local()
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => *naive,
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, .. }) => *date_time,
    }
}

/// Parse an RFC 5545 duration such as `PT1H`, `P1DT2H` or `-PT15M`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    // ---
    let raw = raw.trim();
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let parsed: std::time::Duration = iso8601::duration(unsigned).ok()?.into();
    let duration = Duration::from_std(parsed).ok()?;
    Some(if negative { -duration } else { duration })
}
