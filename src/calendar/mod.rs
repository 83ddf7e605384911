//! Calendar fetcher.
//!
//! Talks CalDAV to the shared calendar collection:
//! - REPORT `calendar-query` with a VEVENT time-range filter
//! - server-side recurrence expansion via `<C:expand>`, with a local RRULE
//!   fallback for servers that return the master event instead
//! - iCalendar parsing of every returned `calendar-data` payload
//!
//! Each VEVENT occurrence becomes one [`crate::Event`].

mod client;
mod ics;
mod recurrence;
mod xml;

pub use client::CalDavClient;
