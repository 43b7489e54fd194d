//! Canonical timestamp handling.
//!
//! Every accepted input format is folded into a single `YYYYMMDDHHMMSS` integer,
//! which orders the same way as the date-times it represents.

use super::ConversionError;
use chrono::{DateTime, NaiveDateTime, Timelike};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const CANONICAL_FORMAT: &str = "%Y%m%d%H%M%S";

/// Converts a raw timestamp into its canonical form.
///
/// Accepts both `2015-02-02 13:33:08 -0500` and `Wed Jul 07 09:13:27 -0700 2010`
/// without being told which one it is. Timezone offsets are dropped; the local
/// wall-clock time is kept.
pub fn parse_canonical(raw: &str) -> Result<u64, ConversionError> {
    let compact: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

    let digits = if starts_with_year(&compact) {
        year_first(&compact)
    } else {
        weekday_first(&compact)
    }
    .ok_or_else(|| ConversionError::UnrecognizedTimestamp(raw.to_string()))??;

    validate(&digits, raw)
}

/// Converts seconds since the Unix epoch into a canonical UTC timestamp
pub fn from_epoch(seconds: i64) -> Option<u64> {
    let datetime = DateTime::from_timestamp(seconds, 0)?;
    datetime.format(CANONICAL_FORMAT).to_string().parse().ok()
}

/// Turns a canonical timestamp back into a date-time
pub fn to_datetime(canonical: u64) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&canonical.to_string(), CANONICAL_FORMAT).ok()
}

/// Hour of day (0-23) of a canonical timestamp
pub fn hour_of(canonical: u64) -> Option<u32> {
    to_datetime(canonical).map(|dt| dt.hour())
}

fn starts_with_year(compact: &str) -> bool {
    compact.len() >= 4 && compact.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}

/// `YYYYMMDDHHMMSS...`: the first fourteen characters are taken positionally
fn year_first(compact: &str) -> Option<Result<String, ConversionError>> {
    let head = compact.get(..14)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(Ok(head.to_string()))
}

/// `<weekday><month><day><time>...<year>`, e.g. `WedJul070913270700` + `2010`
fn weekday_first(compact: &str) -> Option<Result<String, ConversionError>> {
    if compact.len() < 18 || !compact.is_ascii() {
        return None;
    }

    let weekday = &compact[..3];
    let month = &compact[3..6];
    let day_and_time = &compact[6..14];
    let year = &compact[compact.len() - 4..];

    if !weekday.bytes().all(|b| b.is_ascii_alphabetic())
        || !month.bytes().all(|b| b.is_ascii_alphabetic())
        || !day_and_time.bytes().all(|b| b.is_ascii_digit())
        || !year.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let Some(index) = MONTHS.iter().position(|m| *m == month) else {
        return Some(Err(ConversionError::UnknownMonth(month.to_string())));
    };

    Some(Ok(format!("{year}{:02}{day_and_time}", index + 1)))
}

fn validate(digits: &str, raw: &str) -> Result<u64, ConversionError> {
    if NaiveDateTime::parse_from_str(digits, CANONICAL_FORMAT).is_err() {
        return Err(ConversionError::InvalidTimestamp(raw.to_string()));
    }
    digits
        .parse()
        .map_err(|_| ConversionError::InvalidTimestamp(raw.to_string()))
}
