//! Time descriptors for image expiration
//!
//! Two spellings are understood:
//!
//! * colon form `D:H:M:S`, e.g. `1:00:00:00` for one day
//! * unit form understood by `humantime`, e.g. `24h`, `1d 12h`, `90m`, `30s`
//!
//! Both normalise to a whole number of seconds. `Display` always renders the
//! colon form so a round trip through a config file is stable.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Errors produced while parsing a time descriptor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeoutParseError {
    #[error("time descriptor is empty")]
    Empty,

    #[error("colon form needs exactly 4 components (D:H:M:S), got {0}")]
    ComponentCount(usize),

    #[error("'{0}' is not a non-negative integer")]
    InvalidNumber(String),

    #[error("{0}")]
    Duration(String),

    #[error("time descriptor must be a whole number of seconds")]
    SubSecond,

    #[error("time descriptor is too large")]
    Overflow,
}

/// How long an image stays valid after it was last looked up or pulled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpirationTimeout {
    secs: u64,
}

impl ExpirationTimeout {
    pub const fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    pub const fn as_secs(&self) -> u64 {
        self.secs
    }

    pub const fn as_duration(&self) -> Duration {
        Duration::from_secs(self.secs)
    }

    pub const fn is_zero(&self) -> bool {
        self.secs == 0
    }

    fn parse_colon_form(s: &str) -> Result<Self, TimeoutParseError> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err(TimeoutParseError::ComponentCount(parts.len()));
        }

        let mut values = [0u64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = parse_component(part.trim())?;
        }
        let [days, hours, minutes, secs] = values;

        days.checked_mul(24)
            .and_then(|h| h.checked_add(hours))
            .and_then(|h| h.checked_mul(60))
            .and_then(|m| m.checked_add(minutes))
            .and_then(|m| m.checked_mul(60))
            .and_then(|s| s.checked_add(secs))
            .map(Self::from_secs)
            .ok_or(TimeoutParseError::Overflow)
    }

    fn parse_unit_form(s: &str) -> Result<Self, TimeoutParseError> {
        let duration = humantime::parse_duration(s).map_err(|e| match e {
            humantime::DurationError::NumberOverflow => TimeoutParseError::Overflow,
            other => TimeoutParseError::Duration(other.to_string()),
        })?;
        if duration.subsec_nanos() != 0 {
            return Err(TimeoutParseError::SubSecond);
        }
        Ok(Self::from_secs(duration.as_secs()))
    }
}

fn parse_component(part: &str) -> Result<u64, TimeoutParseError> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(TimeoutParseError::InvalidNumber(part.to_string()));
    }
    // all digits, so the only possible failure is overflow
    part.parse().map_err(|_| TimeoutParseError::Overflow)
}

impl FromStr for ExpirationTimeout {
    type Err = TimeoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TimeoutParseError::Empty);
        }
        if s.contains(':') {
            Self::parse_colon_form(s)
        } else {
            Self::parse_unit_form(s)
        }
    }
}

impl fmt::Display for ExpirationTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.secs / SECS_PER_DAY;
        let hours = (self.secs % SECS_PER_DAY) / SECS_PER_HOUR;
        let minutes = (self.secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
        let secs = self.secs % SECS_PER_MINUTE;
        write!(f, "{}:{:02}:{:02}:{:02}", days, hours, minutes, secs)
    }
}

impl From<ExpirationTimeout> for Duration {
    fn from(timeout: ExpirationTimeout) -> Self {
        timeout.as_duration()
    }
}

impl Serialize for ExpirationTimeout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExpirationTimeout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
