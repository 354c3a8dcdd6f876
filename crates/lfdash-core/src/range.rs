//! Lookback ranges (`24h`, `7d`, `30d`, ...) and the concrete window they
//! resolve to at a given instant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RangeOption {
    Hours(u32),
    Days(u32),
}

impl RangeOption {
    pub const PRESETS: [RangeOption; 3] = [
        RangeOption::Hours(24),
        RangeOption::Days(7),
        RangeOption::Days(30),
    ];

    #[must_use]
    pub fn duration(self) -> TimeDelta {
        match self {
            RangeOption::Hours(h) => TimeDelta::hours(i64::from(h)),
            RangeOption::Days(d) => TimeDelta::days(i64::from(d)),
        }
    }

    /// The window of this length ending at `now`.
    #[must_use]
    pub fn window_ending(self, now: DateTime<Utc>) -> DateRange {
        DateRange {
            start: now - self.duration(),
            end: now,
        }
    }
}

impl Default for RangeOption {
    fn default() -> Self {
        RangeOption::Days(7)
    }
}

impl fmt::Display for RangeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeOption::Hours(h) => write!(f, "{h}h"),
            RangeOption::Days(d) => write!(f, "{d}d"),
        }
    }
}

impl FromStr for RangeOption {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let invalid = || CoreError::InvalidRange(s.to_string());
        let (count, make): (&str, fn(u32) -> RangeOption) = if let Some(n) = raw.strip_suffix('h') {
            (n, RangeOption::Hours)
        } else if let Some(n) = raw.strip_suffix('d') {
            (n, RangeOption::Days)
        } else {
            return Err(invalid());
        };
        match count.parse::<u32>() {
            Ok(n) if n > 0 => Ok(make(n)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for RangeOption {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RangeOption> for String {
    fn from(value: RangeOption) -> Self {
        value.to_string()
    }
}

/// A concrete `[start, end]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    #[must_use]
    pub fn length(&self) -> TimeDelta {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_presets() {
        assert_eq!("24h".parse::<RangeOption>(), Ok(RangeOption::Hours(24)));
        assert_eq!("7d".parse::<RangeOption>(), Ok(RangeOption::Days(7)));
        assert_eq!(" 30D ".parse::<RangeOption>(), Ok(RangeOption::Days(30)));
    }

    #[test]
    fn rejects_malformed_ranges() {
        for raw in ["", "d", "0d", "7w", "seven days", "-1h"] {
            assert!(raw.parse::<RangeOption>().is_err(), "{raw} should fail");
        }
    }

    #[test]
    fn display_matches_parse_input() {
        for preset in RangeOption::PRESETS {
            assert_eq!(preset.to_string().parse::<RangeOption>(), Ok(preset));
        }
    }

    #[test]
    fn window_ending_spans_the_duration() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        let window = RangeOption::Days(7).window_ending(now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap());
        assert_eq!(window.length(), TimeDelta::days(7));
        assert!(window.contains(Utc.with_ymd_and_hms(2026, 1, 9, 14, 4, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn serde_uses_display_form() {
        let json = serde_json::to_string(&RangeOption::Hours(24)).unwrap();
        assert_eq!(json, "\"24h\"");
        let back: RangeOption = serde_json::from_str("\"30d\"").unwrap();
        assert_eq!(back, RangeOption::Days(30));
    }
}
