use std::sync::OnceLock;

use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc,
};
use regex::Regex;
use thiserror::Error;

/// RFC 822 layout used by RSS `pubDate`/`lastBuildDate` and OPML dates.
pub const RFC822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Atom timestamps are always written in UTC with a literal `Z`.
pub const ATOM_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub const DEFAULT_DATE_FORMAT: &str = "%F at %T";

// Day and month names are matched loosely; the zone is optional and only
// numeric offsets are honored.
const LENIENT_RFC822: &str = concat!(
    r"^\s*(?:[A-Za-z]+,?\s+)?",
    r"(\d{1,2})\s+([A-Za-z]{3})[A-Za-z]*\.?\s+(\d{2,4})\s+",
    r"(\d{1,2}):(\d{2})(?::(\d{2}))?",
    r"(?:\s*([+-]\d{2}):?(\d{2}))?"
);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("unrecognised date {0:?}")]
    Unrecognised(String),
    #[error("invalid date format string {0:?}")]
    InvalidFormat(String),
}

fn lenient_rfc822() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(LENIENT_RFC822).expect("lenient RFC 822 pattern is valid")
    })
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parses the dates found in RSS `pubDate` elements.
///
/// ```
/// # use cplanet::time::parse_rfc822;
/// let date = parse_rfc822("Tue, 02 Mar 2010 18:04:11 +0100").unwrap();
///
/// assert_eq!(date.to_rfc3339(), "2010-03-02T17:04:11+00:00");
/// ```
pub fn parse_rfc822(date: &str) -> Option<DateTime<Utc>> {
    let date = date.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(date) {
        return Some(parsed.with_timezone(&Utc));
    }

    let caps = lenient_rfc822().captures(date)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let mut year: i32 = caps[3].parse().ok()?;
    if caps[3].len() == 2 {
        year += if year < 70 { 2000 } else { 1900 };
    }
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;
    let second: u32 = match caps.get(6) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, second)?;

    let offset = match (caps.get(7), caps.get(8)) {
        (Some(hours), Some(minutes)) => {
            let (sign, hours) = hours.as_str().split_at(1);
            let hours: i32 = hours.parse().ok()?;
            let minutes: i32 = minutes.as_str().parse().ok()?;
            let seconds = hours * 3600 + minutes * 60;
            FixedOffset::east_opt(if sign == "-" { -seconds } else { seconds })?
        }
        _ => FixedOffset::east_opt(0)?,
    };

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses the dates found in Atom `published`/`updated` and Dublin Core
/// `dc:date` elements.
///
/// ```
/// # use cplanet::time::parse_iso8601;
/// let date = parse_iso8601("2010-03-02T18:04:11+0100").unwrap();
///
/// assert_eq!(date.to_rfc3339(), "2010-03-02T17:04:11+00:00");
/// ```
pub fn parse_iso8601(date: &str) -> Option<DateTime<Utc>> {
    let date = date.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(parsed) = DateTime::parse_from_str(date, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    let naive = date.trim_end_matches('Z');
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
    {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

/// Parses a feed date without knowing which flavour the feed used.
pub fn parse_feed_date(date: &str) -> Result<DateTime<Utc>, DateError> {
    parse_rfc822(date)
        .or_else(|| parse_iso8601(date))
        .ok_or_else(|| DateError::Unrecognised(date.to_owned()))
}

pub fn rfc822(date: &DateTime<Utc>) -> String {
    date.format(RFC822_FORMAT).to_string()
}

/// ```
/// # use cplanet::time::{atom, parse_rfc822};
/// let date = parse_rfc822("Tue, 02 Mar 2010 18:04:11 GMT").unwrap();
///
/// assert_eq!(atom(&date), "2010-03-02T18:04:11Z");
/// ```
pub fn atom(date: &DateTime<Utc>) -> String {
    date.format(ATOM_FORMAT).to_string()
}

/// Formats `date` in the local time zone. `format` must have gone through
/// [`validate_format`] first, chrono panics on unknown specifiers.
pub fn local(date: &DateTime<Utc>, format: &str) -> String {
    date.with_timezone(&Local).format(format).to_string()
}

pub fn validate_format(format: &str) -> Result<(), DateError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(DateError::InvalidFormat(format.to_owned()));
    }
    Ok(())
}
