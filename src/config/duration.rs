//! # Duration Parsing
//!
//! Parses human duration strings such as `10s`, `500ms`, `2m` or `1h30m`
//! for the retry sleep flag.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<number>\d+)(?P<unit>ms|s|m|h)").expect("duration regex is valid")
});

static WHOLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(ms|s|m|h))+$").expect("duration regex is valid"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("duration string cannot be empty")]
    Empty,
    #[error("invalid duration '{0}', expected <number><unit> segments with units ms, s, m or h (e.g. '10s', '1m30s')")]
    InvalidFormat(String),
    #[error("duration '{0}' is too large")]
    Overflow(String),
}

/// Parse a duration made of one or more `<number><unit>` segments
///
/// Units are `ms`, `s`, `m` and `h`. Zero is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let lower = trimmed.to_lowercase();
    if !WHOLE.is_match(&lower) {
        return Err(DurationParseError::InvalidFormat(trimmed.to_string()));
    }

    let mut total = Duration::ZERO;
    for caps in SEGMENT.captures_iter(&lower) {
        let number: u64 = caps["number"]
            .parse()
            .map_err(|_| DurationParseError::Overflow(trimmed.to_string()))?;
        let millis_per_unit: u64 = match &caps["unit"] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            _ => return Err(DurationParseError::InvalidFormat(trimmed.to_string())),
        };
        let millis = number
            .checked_mul(millis_per_unit)
            .ok_or_else(|| DurationParseError::Overflow(trimmed.to_string()))?;
        total = total
            .checked_add(Duration::from_millis(millis))
            .ok_or_else(|| DurationParseError::Overflow(trimmed.to_string()))?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1h0m5s"), Ok(Duration::from_secs(3605)));
        assert_eq!(parse_duration("1s250ms"), Ok(Duration::from_millis(1250)));
    }

    #[test]
    fn test_parse_trims_and_ignores_case() {
        assert_eq!(parse_duration("  15S "), Ok(Duration::from_secs(15)));
    }

    #[test]
    fn test_zero_is_allowed() {
        assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(parse_duration(""), Err(DurationParseError::Empty));
        for bad in ["10", "s", "10x", "1.5s", "-1s", "10s garbage"] {
            assert!(
                matches!(parse_duration(bad), Err(DurationParseError::InvalidFormat(_))),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(matches!(
            parse_duration("99999999999999999999h"),
            Err(DurationParseError::Overflow(_))
        ));
    }
}
