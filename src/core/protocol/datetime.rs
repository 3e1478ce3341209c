// src/core/protocol/datetime.rs

//! The 18-character SIP2 date/time layout: `YYYYMMDDZZZZHHMMSS`.
//!
//! The 4-character zone token is either one of the military zone letters
//! right-aligned in spaces (`   Z` is UTC) or four spaces, meaning "the
//! session's local time".

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use tracing::warn;

/// Width of a date/time field on the wire.
pub const DATE_TIME_WIDTH: usize = 18;

/// The blank zone token: the timestamp is in the session's local time.
pub const LOCAL_ZONE: &str = "    ";

/// Military zone letters and their offsets in hours. `J` is not assigned.
const ZONE_TABLE: &[(&str, i32)] = &[
    ("   Z", 0),
    ("   A", 1),
    ("   B", 2),
    ("   C", 3),
    ("   D", 4),
    ("   E", 5),
    ("   F", 6),
    ("   G", 7),
    ("   H", 8),
    ("   I", 9),
    ("   K", 10),
    ("   L", 11),
    ("   M", 12),
    ("   N", -1),
    ("   O", -2),
    ("   P", -3),
    ("   Q", -4),
    ("   R", -5),
    ("   S", -6),
    ("   T", -7),
    ("   U", -8),
    ("   V", -9),
    ("   W", -10),
    ("   X", -11),
    ("   Y", -12),
];

/// The meaning of a zone token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneToken {
    /// Four spaces: interpret in the session timezone.
    Local,
    /// A fixed offset from the zone table.
    Fixed(FixedOffset),
}

/// Resolves a 4-character zone token against the static table.
pub fn resolve_zone(token: &str) -> Option<ZoneToken> {
    if token == LOCAL_ZONE {
        return Some(ZoneToken::Local);
    }
    let upper = token.to_ascii_uppercase();
    ZONE_TABLE
        .iter()
        .find(|(code, _)| *code == upper)
        .and_then(|(_, hours)| FixedOffset::east_opt(hours * 3600))
        .map(ZoneToken::Fixed)
}

/// An absent date/time field.
pub const BLANK_DATE_TIME: &str = "                  ";

/// Parses an 18-character date/time. An all-blank field is absent; any
/// other malformed component is logged and yields `None`.
pub fn parse_date_time(s: &str, timezone: Tz) -> Option<DateTime<FixedOffset>> {
    if s.trim().is_empty() {
        return None;
    }
    if s.len() != DATE_TIME_WIDTH || !s.is_ascii() {
        warn!("Malformed date/time '{}': expected 18 ASCII characters", s);
        return None;
    }
    let (date_part, rest) = s.split_at(8);
    let (zone_part, time_part) = rest.split_at(4);

    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok();
    let time = NaiveTime::parse_from_str(time_part, "%H%M%S").ok();
    let zone = resolve_zone(zone_part);
    let (Some(date), Some(time), Some(zone)) = (date, time, zone) else {
        warn!("Unparseable date/time '{}'", s);
        return None;
    };

    let naive = NaiveDateTime::new(date, time);
    match zone {
        ZoneToken::Fixed(offset) => offset.from_local_datetime(&naive).single(),
        ZoneToken::Local => timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset()),
    }
}

/// Renders a timestamp in the session timezone with a blank (local) zone token.
pub fn format_date_time<T: TimeZone>(value: &DateTime<T>, timezone: Tz) -> String {
    let local = value.with_timezone(&timezone);
    format!(
        "{}{}{}",
        local.format("%Y%m%d"),
        LOCAL_ZONE,
        local.format("%H%M%S")
    )
}
