//! Timestamps in command bodies use the fixed layout `YYYYMMDD HH:MM`
//! and are read as wall-clock time in the configured zone.
use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::core::ParseError;

pub const TIMESTAMP_LAYOUT: &str = "%Y%m%d %H:%M";

/// Parse `text` as `YYYYMMDD HH:MM` in `zone`.
///
/// Every `T` is stripped before parsing. Fields must have exactly the
/// layout's widths. A wall-clock time repeated by a DST fold resolves
/// to the earlier instant; one skipped by a DST gap is an error.
pub fn parse_timestamp(text: &str, zone: Tz) -> Result<DateTime<Tz>, ParseError> {
    let cleaned: String = text.chars().filter(|c| *c != 'T').collect();
    let naive = parse_naive(&cleaned, text)?;

    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(ParseError::NonexistentLocalTime {
            input: text.to_string(),
            zone: zone.name().to_string(),
        }),
    }
}

/// Inverse of `parse_timestamp`
pub fn format_timestamp(dt: &DateTime<Tz>) -> String {
    dt.format(TIMESTAMP_LAYOUT).to_string()
}

/// Errors report `original`, the text before the `T` was stripped.
fn parse_naive(text: &str, original: &str) -> Result<NaiveDateTime, ParseError> {
    let bytes = text.as_bytes();
    let matches_layout = bytes.len() == 14
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 => *b == b' ',
            11 => *b == b':',
            _ => b.is_ascii_digit(),
        });
    if !matches_layout {
        return Err(ParseError::Layout(original.to_string()));
    }

    let year = digits(&bytes[0..4]) as i32;
    let month = digits(&bytes[4..6]);
    let day = digits(&bytes[6..8]);
    let hour = digits(&bytes[9..11]);
    let minute = digits(&bytes[12..14]);

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ParseError::Calendar(original.to_string()))?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ParseError::Calendar(original.to_string()))?;

    Ok(date.and_time(time))
}

// Caller guarantees ASCII digits
fn digits(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}
