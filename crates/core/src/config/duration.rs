//! Human-friendly duration values for configuration.
//!
//! Optional settings are `Option<Span>` so "disabled" (absent) and
//! "zero" are never conflated. A span keeps the string it was written
//! as and serializes back to it.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

static SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*(s|sec|secs|second|seconds|m|min|mins|minute|minutes|h|hr|hrs|hour|hours|d|day|days|w|week|weeks)\s*$")
        .unwrap()
});

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid duration {0:?} (expected forms like \"30s\", \"10min\", \"12h\", \"3 days\", \"2w\")")]
pub struct SpanParseError(String);

/// A duration written as an amount plus a unit, e.g. "30s" or "2w".
#[derive(Debug, Clone)]
pub struct Span {
    secs: u64,
    repr: String,
}

impl Span {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            secs,
            repr: format!("{}s", secs),
        }
    }

    pub fn as_secs(&self) -> u64 {
        self.secs
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.secs)
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.secs == other.secs
    }
}

impl Eq for Span {}

impl FromStr for Span {
    type Err = SpanParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SPAN_RE
            .captures(s)
            .ok_or_else(|| SpanParseError(s.to_string()))?;

        let amount: u64 = caps[1]
            .parse()
            .map_err(|_| SpanParseError(s.to_string()))?;

        let unit_secs = match caps[2].to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => 1,
            "m" | "min" | "mins" | "minute" | "minutes" => 60,
            "h" | "hr" | "hrs" | "hour" | "hours" => 3_600,
            "d" | "day" | "days" => 86_400,
            "w" | "week" | "weeks" => 604_800,
            _ => unreachable!("unit alternatives are exhaustive"),
        };

        let secs = amount
            .checked_mul(unit_secs)
            .ok_or_else(|| SpanParseError(s.to_string()))?;

        Ok(Self {
            secs,
            repr: s.trim().to_string(),
        })
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl Serialize for Span {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.repr)
    }
}

impl<'de> Deserialize<'de> for Span {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!("30s".parse::<Span>().unwrap().as_secs(), 30);
        assert_eq!("10min".parse::<Span>().unwrap().as_secs(), 600);
        assert_eq!("12h".parse::<Span>().unwrap().as_secs(), 43_200);
        assert_eq!("1d".parse::<Span>().unwrap().as_secs(), 86_400);
        assert_eq!("2w".parse::<Span>().unwrap().as_secs(), 1_209_600);
    }

    #[test]
    fn test_parse_long_units_and_whitespace() {
        assert_eq!("3 days".parse::<Span>().unwrap().as_secs(), 259_200);
        assert_eq!("5 minutes".parse::<Span>().unwrap().as_secs(), 300);
        assert_eq!(" 1 week ".parse::<Span>().unwrap().as_secs(), 604_800);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("30S".parse::<Span>().unwrap().as_secs(), 30);
        assert_eq!("2 Weeks".parse::<Span>().unwrap().as_secs(), 1_209_600);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Span>().is_err());
        assert!("30".parse::<Span>().is_err());
        assert!("s30".parse::<Span>().is_err());
        assert!("30 fortnights".parse::<Span>().is_err());
        assert!("-5s".parse::<Span>().is_err());
        assert!("1.5h".parse::<Span>().is_err());
    }

    #[test]
    fn test_display_keeps_source_form() {
        assert_eq!("10min".parse::<Span>().unwrap().to_string(), "10min");
        assert_eq!("3 days".parse::<Span>().unwrap().to_string(), "3 days");
        assert_eq!(Span::from_secs(600).to_string(), "600s");
    }

    #[test]
    fn test_equality_compares_values_not_spelling() {
        let a: Span = "60s".parse().unwrap();
        let b: Span = "1min".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serde_roundtrip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            every: Span,
        }

        let parsed: Wrapper = toml::from_str(r#"every = "30min""#).unwrap();
        assert_eq!(parsed.every.as_secs(), 1_800);

        let json = serde_json::to_string(&parsed.every).unwrap();
        assert_eq!(json, "\"30min\"");
    }

    #[test]
    fn test_deserialize_rejects_bare_numbers() {
        let result: Result<Span, _> = serde_json::from_str("600");
        assert!(result.is_err());
    }

    #[test]
    fn test_as_duration() {
        let span: Span = "2min".parse().unwrap();
        assert_eq!(span.as_duration(), Duration::from_secs(120));
    }
}
