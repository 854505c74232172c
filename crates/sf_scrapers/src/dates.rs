//! Date grammars used by the Polish sites. Local times are Warsaw time.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::{Europe::Warsaw, Tz};
use lazy_static::lazy_static;
use regex::Regex;
use sf_core::{Error, Result};

lazy_static! {
    static ref DAY_MONTH_YEAR: Regex =
        Regex::new(r"(\d{1,2})\s+(\p{L}+)\s+(\d{4})").expect("valid date pattern");
}

/// Genitive month names, as used after a day number ("22 grudnia 2023").
const MONTHS_GENITIVE: [&str; 12] = [
    "stycznia",
    "lutego",
    "marca",
    "kwietnia",
    "maja",
    "czerwca",
    "lipca",
    "sierpnia",
    "września",
    "października",
    "listopada",
    "grudnia",
];

const MONTHS_NOMINATIVE: [&str; 12] = [
    "styczeń",
    "luty",
    "marzec",
    "kwiecień",
    "maj",
    "czerwiec",
    "lipiec",
    "sierpień",
    "wrzesień",
    "październik",
    "listopad",
    "grudzień",
];

/// Month number (1-12) of a Polish month name.
pub fn polish_month(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS_GENITIVE
        .iter()
        .position(|m| *m == name)
        .or_else(|| MONTHS_NOMINATIVE.iter().position(|m| *m == name))
        .map(|i| i as u32 + 1)
}

/// Parses `text` with a chrono `format`. Formats without a time part yield
/// local midnight.
pub fn parse_local(text: &str, format: &str) -> Result<DateTime<Tz>> {
    let text = text.trim();
    let naive = NaiveDateTime::parse_from_str(text, format)
        .or_else(|_| {
            NaiveDate::parse_from_str(text, format).map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|e| Error::DateParse(format!("{:?} does not match {:?}: {}", text, format, e)))?;
    localize(naive)
}

/// Parses the first "day month-name year" phrase in `text`, e.g.
/// `Data dodania: piątek, 22 grudnia 2023, autor: nuclear.pl`.
pub fn parse_polish_long(text: &str) -> Result<DateTime<Tz>> {
    let captures = DAY_MONTH_YEAR
        .captures(text)
        .ok_or_else(|| Error::DateParse(format!("No Polish date in {:?}", text.trim())))?;

    let day: u32 = captures[1]
        .parse()
        .map_err(|_| Error::DateParse(format!("Bad day in {:?}", text.trim())))?;
    let month = polish_month(&captures[2])
        .ok_or_else(|| Error::DateParse(format!("Unknown month {:?}", &captures[2])))?;
    let year: i32 = captures[3]
        .parse()
        .map_err(|_| Error::DateParse(format!("Bad year in {:?}", text.trim())))?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::DateParse(format!("No such day: {}-{}-{}", year, month, day)))?;
    localize(date.and_time(chrono::NaiveTime::MIN))
}

/// Converts a Unix timestamp to Warsaw time. Values too large to be seconds
/// are taken as milliseconds.
pub fn from_unix(timestamp: i64) -> Result<DateTime<Tz>> {
    let seconds = if timestamp.abs() >= 100_000_000_000 {
        timestamp / 1000
    } else {
        timestamp
    };
    Warsaw
        .timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| Error::DateParse(format!("Timestamp out of range: {}", timestamp)))
}

/// Ambiguous local times take the earlier instant; times inside a DST gap
/// are moved forward by an hour.
fn localize(naive: NaiveDateTime) -> Result<DateTime<Tz>> {
    Warsaw
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Warsaw.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .ok_or_else(|| Error::DateParse(format!("Nonexistent local time: {}", naive)))
}
