//! Automatic date histogram interval calculation
//!
//! A date histogram configured with `auto` gets an interval derived from the
//! width of the requested window divided by the desired number of data points,
//! rounded to a human-friendly step and clamped to the datasource minimum.

use crate::error::{Error, Result};
use crate::time_range::TimeRange;
use chrono::Duration;

/// Target number of buckets when nothing else is configured
pub const DEFAULT_MAX_DATA_POINTS: i64 = 1500;

/// Smallest interval ever produced
pub const DEFAULT_MIN_INTERVAL_MS: i64 = 1;

const SECOND: i64 = 1000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const YEAR: i64 = 365 * DAY;

/// Rounding table: (upper bound inclusive, rounded value), both in milliseconds
const ROUNDING: &[(i64, i64)] = &[
    (15, 10),
    (35, 20),
    (75, 50),
    (150, 100),
    (350, 200),
    (750, 500),
    (1_500, SECOND),
    (3_500, 2 * SECOND),
    (7_500, 5 * SECOND),
    (12_500, 10 * SECOND),
    (17_500, 15 * SECOND),
    (25_000, 20 * SECOND),
    (45_000, 30 * SECOND),
    (90_000, MINUTE),
    (210_000, 2 * MINUTE),
    (450_000, 5 * MINUTE),
    (750_000, 10 * MINUTE),
    (1_050_000, 15 * MINUTE),
    (1_500_000, 20 * MINUTE),
    (2_700_000, 30 * MINUTE),
    (5_400_000, HOUR),
    (9_000_000, 2 * HOUR),
    (16_200_000, 3 * HOUR),
    (32_400_000, 6 * HOUR),
    (86_400_000, 12 * HOUR),
    (172_800_000, DAY),
    (604_800_000, DAY),
    (1_814_400_000, WEEK),
    (3_628_799_999, 30 * DAY),
];

/// A calculated interval with its textual form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub text: String,
    pub millis: i64,
}

impl Interval {
    pub fn from_millis(millis: i64) -> Self {
        Self {
            text: format_interval(millis),
            millis,
        }
    }
}

/// Derives `auto` intervals for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalCalculator {
    max_data_points: i64,
    min_interval_ms: i64,
}

impl Default for IntervalCalculator {
    fn default() -> Self {
        Self {
            max_data_points: DEFAULT_MAX_DATA_POINTS,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
        }
    }
}

impl IntervalCalculator {
    pub fn new(max_data_points: i64, min_interval_ms: i64) -> Self {
        Self {
            max_data_points: max_data_points.max(1),
            min_interval_ms: min_interval_ms.max(DEFAULT_MIN_INTERVAL_MS),
        }
    }

    /// Same calculator with a different minimum, e.g. a per-query override
    pub fn with_min_interval(self, min_interval_ms: i64) -> Self {
        Self::new(self.max_data_points, min_interval_ms)
    }

    pub fn calculate(&self, range: &TimeRange) -> Result<Interval> {
        let span = range.span()?.num_milliseconds();
        let raw = span / self.max_data_points;

        if raw < self.min_interval_ms {
            return Ok(Interval::from_millis(self.min_interval_ms));
        }

        Ok(Interval::from_millis(round_interval(raw)))
    }
}

/// Round a raw interval to the nearest friendly step
pub fn round_interval(millis: i64) -> i64 {
    ROUNDING
        .iter()
        .find(|(bound, _)| millis <= *bound)
        .map(|(_, rounded)| *rounded)
        .unwrap_or(YEAR)
}

/// Format milliseconds using the largest whole unit
pub fn format_interval(millis: i64) -> String {
    if millis >= YEAR {
        format!("{}y", millis / YEAR)
    } else if millis >= DAY {
        format!("{}d", millis / DAY)
    } else if millis >= HOUR {
        format!("{}h", millis / HOUR)
    } else if millis >= MINUTE {
        format!("{}m", millis / MINUTE)
    } else if millis >= SECOND {
        format!("{}s", millis / SECOND)
    } else if millis >= 1 {
        format!("{}ms", millis)
    } else {
        "1ms".to_string()
    }
}

/// Parse an interval such as `10s`, `1m` or `>30s` into milliseconds
///
/// A leading `>` is accepted and ignored; it marks the value as a lower bound
/// in datasource settings.
pub fn parse_interval(s: &str) -> Result<i64> {
    let s = s.trim().trim_start_matches('>');
    let invalid = || Error::Config(format!("invalid interval: '{}'", s));

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (num, unit) = s.split_at(split);
    let n: i64 = num.parse().map_err(|_| invalid())?;

    let step = match unit {
        "ms" => Duration::try_milliseconds(n),
        "s" => Duration::try_seconds(n),
        "m" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        "w" => Duration::try_weeks(n),
        "y" => Duration::try_days(n.checked_mul(365).ok_or_else(invalid)?),
        _ => None,
    };

    step.map(|d| d.num_milliseconds()).ok_or_else(invalid)
}
