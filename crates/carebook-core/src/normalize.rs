//! Date and slot normalization.
//!
//! Availability data reaches the client in several shapes: plain date
//! strings, full ISO datetimes, locale-formatted dates, `{date: ...}`
//! objects, and time slots that carry either a canonical ISO instant, a raw
//! `HH:MM`, or only a display label. This module reduces all of them to a
//! canonical `YYYY-MM-DD` date and a canonical ISO datetime.
//!
//! Nothing here returns an error: unparseable dates become `None` (the
//! caller drops them) and unparseable slot times fall back to midday on the
//! selected date so the caller always gets a bookable instant.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::warn;

use crate::model::TimeSlot;
use crate::time::date_key as format_date_key;

/// Matches `H:MM` or `HH:MM`.
static CLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):([0-5]\d)$").expect("Invalid clock regex"));

/// Time used when a slot carries nothing usable.
pub const FALLBACK_TIME: &str = "12:00:00";

/// Naive datetime layouts tried after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Locale date layouts, tried last.
const LOCALE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%a %b %d %Y",
    "%A, %B %d, %Y",
];

/// A date-like value as it may appear in an availability payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateLike {
    /// A bare string: `YYYY-MM-DD`, an ISO datetime or a locale date.
    Text(String),
    /// An object carrying a `date` field.
    Object { date: Option<String> },
    /// An already-parsed date.
    Date(NaiveDate),
}

impl From<&str> for DateLike {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DateLike {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for DateLike {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

/// Converts a date-like value to a date, or `None` if it cannot be parsed.
pub fn normalize_date(value: &DateLike) -> Option<NaiveDate> {
    match value {
        DateLike::Text(text) => parse_date_text(text),
        DateLike::Object { date } => date.as_deref().and_then(parse_date_text),
        DateLike::Date(date) => Some(*date),
    }
}

/// Converts a date-like value to its canonical `YYYY-MM-DD` key.
pub fn date_key(value: &DateLike) -> Option<String> {
    normalize_date(value).map(format_date_key)
}

/// Normalizes a batch of date-like values, dropping the unparseable ones.
///
/// The result is sorted and free of duplicates.
pub fn normalize_dates<I>(values: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = DateLike>,
{
    let mut dates: Vec<NaiveDate> = values
        .into_iter()
        .filter_map(|value| {
            let parsed = normalize_date(&value);
            if parsed.is_none() {
                warn!(value = ?value, "Dropping unparseable availability date");
            }
            parsed
        })
        .collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    // Keep the calendar date as written; converting to UTC would shift it.
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }

    // `YYYY-MM-DD` prefix followed by a time we could not parse exactly.
    if let (Some(prefix), Some(rest)) = (text.get(..10), text.get(10..))
        && matches!(rest.chars().next(), Some('T' | ' '))
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        return Some(date);
    }

    LOCALE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Which rule produced a slot's datetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// The slot's canonical ISO time, used verbatim.
    Canonical,
    /// A raw value that already held a full datetime, used verbatim.
    RawDateTime,
    /// A raw `H:MM`/`HH:MM` combined with the selected date.
    RawClock,
    /// Nothing usable; midday on the selected date.
    MiddayFallback,
}

/// A slot's resolved ISO datetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDateTime {
    pub iso: String,
    pub source: SlotSource,
}

impl SlotDateTime {
    /// Returns `true` if the time is the midday approximation.
    pub fn is_fallback(&self) -> bool {
        self.source == SlotSource::MiddayFallback
    }
}

/// Resolves the ISO datetime to book for `slot` on `date`.
///
/// Precedence:
/// 1. `iso_time`, verbatim;
/// 2. a raw value that parses as an ISO datetime, verbatim;
/// 3. a raw `H:MM` or `HH:MM`, as `{date}T{HH:MM}:00`;
/// 4. `{date}T12:00:00`.
///
/// Raw candidates are `raw_time` first, then the display `time`.
pub fn slot_datetime(slot: &TimeSlot, date: NaiveDate) -> SlotDateTime {
    if let Some(iso) = non_blank(slot.iso_time.as_deref()) {
        return SlotDateTime {
            iso: iso.to_string(),
            source: SlotSource::Canonical,
        };
    }

    let day = format_date_key(date);
    let candidates = [non_blank(slot.raw_time.as_deref()), non_blank(Some(&slot.time))];

    for raw in candidates.into_iter().flatten() {
        if is_iso_datetime(raw) {
            return SlotDateTime {
                iso: raw.to_string(),
                source: SlotSource::RawDateTime,
            };
        }

        if let Some(caps) = CLOCK_REGEX.captures(raw)
            && let Ok(hour) = caps[1].parse::<u32>()
            && hour < 24
        {
            return SlotDateTime {
                iso: format!("{}T{:02}:{}:00", day, hour, &caps[2]),
                source: SlotSource::RawClock,
            };
        }
    }

    warn!(
        date = %day,
        time = %slot.time,
        raw_time = ?slot.raw_time,
        "Slot has no usable time, falling back to midday"
    );
    SlotDateTime {
        iso: format!("{}T{}", day, FALLBACK_TIME),
        source: SlotSource::MiddayFallback,
    }
}

/// `YYYY-MM-DDTHH:MM[...]`, with or without an offset.
fn is_iso_datetime(raw: &str) -> bool {
    if !raw.contains('T') {
        return false;
    }
    DateTime::parse_from_rfc3339(raw).is_ok()
        || DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z").is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(raw, format).is_ok())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
