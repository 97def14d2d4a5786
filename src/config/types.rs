use std::fmt;
use std::sync::OnceLock;

use regex_lite::{Regex, RegexBuilder};
use serde::de::{Error as DeError, Unexpected, Visitor};
use serde::{Deserialize, Deserializer};

/// A config duration, written either as whole seconds or as a string like
/// `"1h"`, `"90m"` or `"1d 12h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration(std::time::Duration);

impl Duration {
    pub const fn from_secs(seconds: u64) -> Self {
        Self(std::time::Duration::from_secs(seconds))
    }
}

impl From<Duration> for std::time::Duration {
    fn from(duration: Duration) -> Self {
        duration.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(duration: std::time::Duration) -> Self {
        Self(duration)
    }
}

fn parse_duration_str(s: &str) -> Option<Duration> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();

    let pattern = PATTERN.get_or_init(|| {
        RegexBuilder::new(
            r"
            ^
            (?:(?<days>    \d+)d)? \s*
            (?:(?<hours>   \d+)h)? \s*
            (?:(?<minutes> \d+)m)? \s*
            (?:(?<seconds> \d+)s)?
            $",
        )
        .ignore_whitespace(true)
        .build()
        .unwrap()
    });

    let captures = pattern.captures(s)?;

    // The regex matches the empty string; require at least one component.
    if captures.name("days").is_none()
        && captures.name("hours").is_none()
        && captures.name("minutes").is_none()
        && captures.name("seconds").is_none()
    {
        return None;
    }

    let field = |name: &str| -> Option<u64> {
        captures
            .name(name)
            .map_or(Some(0), |m| m.as_str().parse().ok())
    };

    field("days")?
        .checked_mul(24)
        .and_then(|h| h.checked_add(field("hours")?))
        .and_then(|h| h.checked_mul(60))
        .and_then(|m| m.checked_add(field("minutes")?))
        .and_then(|m| m.checked_mul(60))
        .and_then(|s| s.checked_add(field("seconds")?))
        .map(Duration::from_secs)
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a duration")
            }

            fn visit_i64<E: DeError>(self, v: i64) -> Result<Self::Value, E> {
                self.visit_u64(v.try_into().map_err(E::custom)?)
            }

            fn visit_u64<E: DeError>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Duration::from_secs(v))
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                parse_duration_str(v)
                    .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &"a duration"))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_strings() {
        assert_eq!(parse_duration_str("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration_str("90m"), Some(Duration::from_secs(5400)));
        assert_eq!(
            parse_duration_str("1d 12h"),
            Some(Duration::from_secs(36 * 3600))
        );
        assert_eq!(parse_duration_str("15s"), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration_str(""), None);
        assert_eq!(parse_duration_str("soon"), None);
    }
}
