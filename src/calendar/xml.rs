//! WebDAV XML for the CalDAV `calendar-query` REPORT.

use std::{fmt, io::Cursor};

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, Event as XmlEvent};
use quick_xml::{Reader, Writer};

use crate::error::{FetchError, FetchResult, Upstream};

pub const DAV_NS: &str = "DAV:";
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Build a `calendar-query` for VEVENTs overlapping `[start, end)`.
///
/// The `expand` element asks the server to return one VEVENT per occurrence
/// of recurring events, with times in UTC.
pub fn calendar_query_body(start: DateTime<Utc>, end: DateTime<Utc>) -> FetchResult<String> {
    // ---
    let start = format_utc(start);
    let end = format_utc(end);
    let range = [("start", start.as_str()), ("end", end.as_str())];

    let mut w = Writer::new(Cursor::new(Vec::new()));

    open(
        &mut w,
        "c:calendar-query",
        &[("xmlns:d", DAV_NS), ("xmlns:c", CALDAV_NS)],
    )?;

    open(&mut w, "d:prop", &[])?;
    empty(&mut w, "d:getetag", &[])?;
    open(&mut w, "c:calendar-data", &[])?;
    empty(&mut w, "c:expand", &range)?;
    close(&mut w, "c:calendar-data")?;
    close(&mut w, "d:prop")?;

    open(&mut w, "c:filter", &[])?;
    open(&mut w, "c:comp-filter", &[("name", "VCALENDAR")])?;
    open(&mut w, "c:comp-filter", &[("name", "VEVENT")])?;
    empty(&mut w, "c:time-range", &range)?;
    close(&mut w, "c:comp-filter")?;
    close(&mut w, "c:comp-filter")?;
    close(&mut w, "c:filter")?;

    close(&mut w, "c:calendar-query")?;

    String::from_utf8(w.into_inner().into_inner()).map_err(encode_error)
}

/// Extract every `calendar-data` payload from a `207 Multi-Status` body.
pub fn parse_multistatus(xml: &str) -> FetchResult<Vec<String>> {
    // ---
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut results = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) if local_name(e.name().as_ref()) == b"calendar-data" => {
                current = Some(String::new());
            }
            Ok(XmlEvent::End(e)) if local_name(e.name().as_ref()) == b"calendar-data" => {
                if let Some(data) = current.take() {
                    if !data.is_empty() {
                        results.push(data);
                    }
                }
            }
            Ok(XmlEvent::Text(e)) => {
                if let Some(data) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| FetchError::malformed(Upstream::Calendar, e))?;
                    data.push_str(&text);
                }
            }
            Ok(XmlEvent::CData(e)) => {
                if let Some(data) = current.as_mut() {
                    data.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(XmlEvent::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FetchError::malformed(
                    Upstream::Calendar,
                    format!("invalid multistatus XML at {}: {}", reader.buffer_position(), e),
                ))
            }
        }
    }

    Ok(results)
}

fn open(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> FetchResult<()> {
    w.write_event(XmlEvent::Start(element(name, attrs)))
        .map_err(encode_error)
}

fn empty(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> FetchResult<()> {
    w.write_event(XmlEvent::Empty(element(name, attrs)))
        .map_err(encode_error)
}

fn close(w: &mut XmlWriter, name: &str) -> FetchResult<()> {
    w.write_event(XmlEvent::End(BytesEnd::new(name)))
        .map_err(encode_error)
}

fn element<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for attr in attrs {
        start.push_attribute(*attr);
    }
    start
}

fn encode_error(e: impl fmt::Display) -> FetchError {
    FetchError::malformed(Upstream::Calendar, format!("encoding calendar-query: {}", e))
}

/// Strip the namespace prefix from an element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// iCalendar UTC form used by `time-range` and `expand`.
fn format_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}
