//! ISO 8601 text forms for temporal values
//!
//! Datetimes without an offset use `YYYY-MM-DDTHH:MM:SS[.fff]`, datetimes with
//! an offset use RFC 3339, and durations use `[-]PT<seconds>S`. Parsers also
//! accept the common variants a user types by hand.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Datetime parsed from text, with or without a UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDateTime {
    /// No offset given
    Naive(NaiveDateTime),
    /// Offset given
    Zoned(DateTime<FixedOffset>),
}

/// Format a datetime without offset
#[must_use]
pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Format a datetime with offset
#[must_use]
pub fn format_zoned(value: &DateTime<FixedOffset>) -> String {
    value.to_rfc3339()
}

/// Format a calendar date
#[must_use]
pub fn format_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Format a time of day
#[must_use]
pub fn format_time(value: &NaiveTime) -> String {
    value.format(TIME_FORMAT).to_string()
}

/// Format a duration as `PT<seconds>S`
#[must_use]
pub fn format_duration(value: &TimeDelta) -> String {
    let negative = *value < TimeDelta::zero();
    let magnitude = if negative { -*value } else { *value };
    let seconds = magnitude.num_seconds();
    let nanos = magnitude.subsec_nanos();
    let sign = if negative { "-" } else { "" };

    if nanos == 0 {
        format!("{sign}PT{seconds}S")
    } else {
        let fraction = format!("{nanos:09}");
        format!("{sign}PT{seconds}.{}S", fraction.trim_end_matches('0'))
    }
}

/// Parse a datetime, with or without offset
///
/// A bare date is read as midnight.
#[must_use]
pub fn parse_datetime(text: &str) -> Option<ParsedDateTime> {
    let text = text.trim();
    if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
        return Some(ParsedDateTime::Zoned(zoned));
    }
    for format in [DATETIME_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ParsedDateTime::Naive(naive));
        }
    }
    parse_date(text)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(ParsedDateTime::Naive)
}

/// Parse a calendar date
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

/// Parse a time of day (`HH:MM` or `HH:MM:SS[.fff]`)
#[must_use]
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

/// Parse a duration
///
/// Accepts `[-]P[nD][T[nH][nM][n[.f]S]]` and plain (possibly fractional)
/// seconds.
#[must_use]
pub fn parse_duration(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    if let Some(delta) = parse_seconds(text) {
        return Some(delta);
    }

    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix(['P', 'p'])?;
    let (date_part, time_part) = match rest.find(['T', 't']) {
        Some(at) => (&rest[..at], Some(&rest[at + 1..])),
        None => (rest, None),
    };

    let mut total = TimeDelta::zero();
    let mut any = false;

    if !date_part.is_empty() {
        let days = date_part.strip_suffix(['D', 'd'])?;
        total = total.checked_add(&TimeDelta::try_days(days.parse().ok()?)?)?;
        any = true;
    }

    if let Some(mut time) = time_part {
        if time.is_empty() {
            return None;
        }
        for (unit, per) in [(['H', 'h'], 3600_i64), (['M', 'm'], 60)] {
            if let Some(at) = time.find(unit) {
                let amount: i64 = time[..at].parse().ok()?;
                let span = TimeDelta::try_seconds(amount.checked_mul(per)?)?;
                total = total.checked_add(&span)?;
                time = &time[at + 1..];
                any = true;
            }
        }
        if !time.is_empty() {
            let seconds = time.strip_suffix(['S', 's'])?;
            total = total.checked_add(&parse_seconds(seconds)?)?;
            any = true;
        }
    }

    if !any {
        return None;
    }
    Some(if negative { -total } else { total })
}

fn parse_seconds(text: &str) -> Option<TimeDelta> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let seconds = TimeDelta::try_seconds(whole.parse().ok()?)?;
    let nanos = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}").parse::<i64>().ok()?
    };
    let total = seconds.checked_add(&TimeDelta::nanoseconds(nanos))?;
    Some(if negative { -total } else { total })
}
