//! Go duration strings (`10s`, `1m30s`, `250ms`).
//!
//! The agent parses every duration-valued query parameter (`wait`) and check
//! field (`Interval`, `TTL`, ...) with Go's `time.ParseDuration`, so this is
//! the one wire format used for [`Duration`] values anywhere in the API.
//!
//! | Duration | Encoded |
//! |----------|---------|
//! | zero | `0s` |
//! | 250 ms | `250ms` |
//! | 1.5 s | `1.5s` |
//! | 10 s | `10s` |
//! | 90 s | `1m30s` |
//! | 1 h 1 min | `1h1m` |

use std::time::Duration;

use thiserror::Error;

/// Errors from [`parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration string")]
    Empty,

    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("duration {0:?} overflows")]
    Overflow(String),
}

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Encode `d` as a Go duration string.
///
/// Whole seconds and above are split into `h`/`m`/`s` components with the
/// seconds carrying the full nanosecond fraction; anything shorter than a
/// second is emitted in `ms`, `us` or `ns` with its own fraction. Trailing
/// zeros are trimmed, so `parse(&format(d)) == d` for every `d`.
pub fn format(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }

    let nanos = d.subsec_nanos();
    if d.as_secs() == 0 {
        let (scale, width, unit) = match nanos {
            0..=999 => (1, 0, "ns"),
            1_000..=999_999 => (1_000, 3, "us"),
            _ => (1_000_000, 6, "ms"),
        };
        return format!("{}{unit}", decimal(u64::from(nanos / scale), nanos % scale, width));
    }

    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 || nanos > 0 {
        out.push_str(&decimal(seconds, nanos, 9));
        out.push('s');
    }
    out
}

/// `whole.fraction` with `fraction` zero-padded to `width` digits and
/// trailing zeros dropped.
fn decimal(whole: u64, fraction: u32, width: usize) -> String {
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse a Go duration string such as `"1h2m3.5s"` or `"300ms"`.
///
/// Negative durations are rejected. A bare `"0"` is accepted, as in Go.
pub fn parse(input: &str) -> Result<Duration, DurationParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationParseError::Empty);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let invalid = || DurationParseError::Invalid(input.to_string());
    let mut rest = s;
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| DurationParseError::MissingUnit(input.to_string()))?;
        if num_end == 0 {
            return Err(invalid());
        }
        let (number, tail) = rest.split_at(num_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3600 * NANOS_PER_SEC,
            other => {
                return Err(DurationParseError::UnknownUnit {
                    unit: other.to_string(),
                    input: input.to_string(),
                })
            }
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| DurationParseError::Overflow(input.to_string()))?;
        let mut place = scale;
        for digit in fraction.chars() {
            let digit = digit.to_digit(10).ok_or_else(invalid)?;
            place /= 10;
            nanos += u128::from(digit) * place;
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| DurationParseError::Overflow(input.to_string()))?;
        rest = next;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| DurationParseError::Overflow(input.to_string()))?;
    // Remainder is below 1e9, so it fits.
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Serde adapter for `Option<Duration>` fields carried as Go duration strings.
///
/// Use together with `#[serde(default, skip_serializing_if = "Option::is_none")]`.
pub mod option {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_str(&super::format(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) if !raw.is_empty() => super::parse(&raw).map(Some).map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_seconds_and_compound_values() {
        assert_eq!(format(Duration::ZERO), "0s");
        assert_eq!(format(Duration::from_secs(10)), "10s");
        assert_eq!(format(Duration::from_secs(60)), "1m");
        assert_eq!(format(Duration::from_secs(90)), "1m30s");
        assert_eq!(format(Duration::from_secs(3600)), "1h");
        assert_eq!(format(Duration::from_secs(3660)), "1h1m");
        assert_eq!(format(Duration::from_secs(5 * 60)), "5m");
    }

    #[test]
    fn formats_sub_second_values() {
        assert_eq!(format(Duration::from_millis(250)), "250ms");
        assert_eq!(format(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format(Duration::from_millis(65_250)), "1m5.25s");
        assert_eq!(format(Duration::from_micros(15)), "15us");
        assert_eq!(format(Duration::from_nanos(7)), "7ns");
    }

    #[test]
    fn keeps_the_full_fraction() {
        assert_eq!(format(Duration::from_micros(1_000_500)), "1.0005s");
        assert_eq!(format(Duration::from_micros(1_500)), "1.5ms");
        assert_eq!(format(Duration::from_nanos(1_500)), "1.5us");
        assert_eq!(format(Duration::from_nanos(10_000_000_001)), "10.000000001s");
        assert_eq!(format(Duration::from_nanos(90_000_000_010)), "1m30.00000001s");
        assert_eq!(format(Duration::from_nanos(999_999_999)), "999.999999ms");
    }

    #[test]
    fn parses_go_durations() {
        assert_eq!(parse("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse("1.5s"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse(".5s"), Ok(Duration::from_millis(500)));
        assert_eq!(parse("2h45m"), Ok(Duration::from_secs(2 * 3600 + 45 * 60)));
        assert_eq!(parse("0"), Ok(Duration::ZERO));
        assert_eq!(parse("10µs"), Ok(Duration::from_micros(10)));
    }

    #[test]
    fn formatted_values_parse_back() {
        for d in [
            Duration::from_millis(1),
            Duration::from_millis(999),
            Duration::from_secs(10),
            Duration::from_millis(61_005),
            Duration::from_secs(7 * 3600 + 1),
            Duration::from_micros(1_000_500),
            Duration::from_micros(1_500),
            Duration::from_nanos(1_001),
            Duration::from_nanos(10_000_000_001),
            Duration::from_nanos(999_999_999),
            Duration::new(3 * 3600 + 59, 123_456_789),
            Duration::new(u64::MAX / 4, 1),
        ] {
            assert_eq!(parse(&format(d)), Ok(d), "{}", format(d));
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse(""), Err(DurationParseError::Empty));
        assert!(matches!(parse("10"), Err(DurationParseError::MissingUnit(_))));
        assert!(matches!(parse("10d"), Err(DurationParseError::UnknownUnit { .. })));
        assert!(matches!(parse("-5s"), Err(DurationParseError::Invalid(_))));
        assert!(matches!(parse("1.2.3s"), Err(DurationParseError::Invalid(_))));
        assert!(matches!(parse("s"), Err(DurationParseError::Invalid(_))));
    }
}
