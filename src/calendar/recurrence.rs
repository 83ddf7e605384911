//! Client-side RRULE expansion for servers that ignore `<C:expand>`.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, Utc};
use icalendar::{CalendarDateTime, Component, DatePerhapsTime};
use rrule::{RRuleSet, Tz};
use tracing::warn;

use super::ics::{local_naive, ICAL_DATE_TIME};

/// Upper bound on occurrences generated for one recurring VEVENT.
const MAX_OCCURRENCES: u16 = 1000;

/// A recurring master VEVENT: it carries an RRULE and is not itself an
/// override of one occurrence.
pub fn is_master(event: &icalendar::Event) -> bool {
    event.property_value("RRULE").is_some() && event.property_value("RECURRENCE-ID").is_none()
}

/// Start times of every occurrence of `event` that overlaps the window,
/// as local wall-clock times in the same frame as [`local_naive`].
///
/// `span` is the length of one occurrence; occurrences that started before
/// `window_start` but are still running are included.
pub fn occurrences(
    event: &icalendar::Event,
    start: &DatePerhapsTime,
    span: Option<Duration>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<NaiveDateTime> {
    // ---
    let Some(rule) = event.property_value("RRULE") else {
        return vec![local_naive(start)];
    };

    let set: RRuleSet = match rule_set(event, start, rule).parse() {
        Ok(set) => set,
        Err(e) => {
            warn!(
                uid = event.get_uid().unwrap_or("<no uid>"),
                "could not expand RRULE, keeping the first occurrence only: {}", e
            );
            return vec![local_naive(start)];
        }
    };

    let lead = span.unwrap_or_else(Duration::zero) + Duration::seconds(1);
    let result = set
        .after((window_start - lead).with_timezone(&Tz::UTC))
        .before(window_end.with_timezone(&Tz::UTC))
        .all(MAX_OCCURRENCES);
    if result.limited {
        warn!(
            uid = event.get_uid().unwrap_or("<no uid>"),
            limit = MAX_OCCURRENCES,
            "RRULE expansion truncated"
        );
    }

    result
        .dates
        .into_iter()
        .map(|occurrence| match start {
            DatePerhapsTime::DateTime(CalendarDateTime::Utc(_)) => {
                occurrence.with_timezone(&Local).naive_local()
            }
            _ => occurrence.naive_local(),
        })
        .collect()
}

/// Render DTSTART, RRULE and EXDATE in the text form `rrule` parses.
///
/// All-day starts are expanded as midnight so date-only EXDATEs are dropped.
fn rule_set(event: &icalendar::Event, start: &DatePerhapsTime, rule: &str) -> String {
    // ---
    let (params, value) = match start {
        DatePerhapsTime::Date(date) => (
            String::new(),
            date.and_time(NaiveTime::MIN).format(ICAL_DATE_TIME).to_string(),
        ),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => {
            (String::new(), format!("{}Z", dt.format(ICAL_DATE_TIME)))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            (String::new(), naive.format(ICAL_DATE_TIME).to_string())
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => (
            format!(";TZID={}", tzid),
            date_time.format(ICAL_DATE_TIME).to_string(),
        ),
    };

    let mut text = format!("DTSTART{params}:{value}\nRRULE:{rule}");
    if let Some(exdate) = event.property_value("EXDATE").filter(|v| v.contains('T')) {
        text.push_str(&format!("\nEXDATE{params}:{exdate}"));
    }
    text
}
