//! Time ranges with relative or absolute endpoints
//!
//! An endpoint is one of:
//! - `now`
//! - a relative offset, either bare (`5m`, `1h30m`) or anchored (`now-5m`, `now+1d`)
//! - an integer epoch in milliseconds (`1500000000000`)
//! - an RFC 3339 timestamp (`2017-07-14T02:40:00Z`)
//!
//! Bare offsets point into the past. Relative endpoints are resolved against the
//! `now` instant captured when the range was constructed, so the same range
//! always resolves to the same boundaries.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Months, Utc};
use regex::Regex;
use std::sync::OnceLock;

fn offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)(ms|s|m|h|d|w|M|y)").expect("offset regex is valid")
    })
}

/// An inclusive time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    from: String,
    to: String,
    now: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range whose relative endpoints are anchored at the current instant
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::with_now(from, to, Utc::now())
    }

    /// Create a range anchored at an explicit instant
    pub fn with_now(from: impl Into<String>, to: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            now,
        }
    }

    /// Create an absolute range from epoch milliseconds
    pub fn from_epoch_millis(from: i64, to: i64) -> Self {
        Self::new(from.to_string(), to.to_string())
    }

    pub fn raw_from(&self) -> &str {
        &self.from
    }

    pub fn raw_to(&self) -> &str {
        &self.to
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn parse_from(&self) -> Result<DateTime<Utc>> {
        parse_endpoint(&self.from, self.now)
    }

    pub fn parse_to(&self) -> Result<DateTime<Utc>> {
        parse_endpoint(&self.to, self.now)
    }

    /// Resolve both endpoints, enforcing `from <= to`
    pub fn resolve(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let from = self.parse_from()?;
        let to = self.parse_to()?;
        if from > to {
            return Err(Error::InvalidTimeRange(format!(
                "from '{}' resolves after to '{}'",
                self.from, self.to
            )));
        }
        Ok((from, to))
    }

    pub fn from_ms(&self) -> Result<i64> {
        Ok(self.parse_from()?.timestamp_millis())
    }

    pub fn to_ms(&self) -> Result<i64> {
        Ok(self.parse_to()?.timestamp_millis())
    }

    /// Both boundaries as epoch milliseconds
    pub fn bounds_ms(&self) -> Result<(i64, i64)> {
        let (from, to) = self.resolve()?;
        Ok((from.timestamp_millis(), to.timestamp_millis()))
    }

    /// Width of the window
    pub fn span(&self) -> Result<Duration> {
        let (from, to) = self.resolve()?;
        Ok(to - from)
    }
}

/// Parse a single endpoint relative to `now`
pub fn parse_endpoint(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = raw.trim();

    if s.is_empty() {
        return Err(Error::InvalidTimeRange("empty time expression".to_string()));
    }

    if s == "now" {
        return Ok(now);
    }

    if let Ok(ms) = s.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms).ok_or_else(|| {
            Error::InvalidTimeRange(format!("epoch milliseconds out of range: {}", s))
        });
    }

    if let Some(rest) = s.strip_prefix("now-") {
        let offset = parse_offset(rest)?;
        return offset.subtract_from(now, raw);
    }

    if let Some(rest) = s.strip_prefix("now+") {
        let offset = parse_offset(rest)?;
        return offset.add_to(now, raw);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let offset = parse_offset(s)?;
    offset.subtract_from(now, raw)
}

/// Relative offset split into a fixed part and a calendar-month part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Offset {
    fixed: Duration,
    months: u32,
}

impl Offset {
    fn zero() -> Self {
        Self {
            fixed: Duration::zero(),
            months: 0,
        }
    }

    fn subtract_from(self, now: DateTime<Utc>, raw: &str) -> Result<DateTime<Utc>> {
        now.checked_sub_signed(self.fixed)
            .and_then(|t| t.checked_sub_months(Months::new(self.months)))
            .ok_or_else(|| Error::InvalidTimeRange(format!("offset out of range: {}", raw)))
    }

    fn add_to(self, now: DateTime<Utc>, raw: &str) -> Result<DateTime<Utc>> {
        now.checked_add_signed(self.fixed)
            .and_then(|t| t.checked_add_months(Months::new(self.months)))
            .ok_or_else(|| Error::InvalidTimeRange(format!("offset out of range: {}", raw)))
    }
}

fn parse_offset(s: &str) -> Result<Offset> {
    let invalid = || Error::InvalidTimeRange(format!("unparsable time expression: '{}'", s));

    let mut offset = Offset::zero();
    let mut consumed = 0;

    for caps in offset_regex().captures_iter(s) {
        let whole = caps.get(0).ok_or_else(invalid)?;
        if whole.start() != consumed {
            return Err(invalid());
        }
        consumed = whole.end();

        let n: i64 = caps[1].parse().map_err(|_| invalid())?;
        let fixed = match &caps[2] {
            "ms" => Duration::try_milliseconds(n),
            "s" => Duration::try_seconds(n),
            "m" => Duration::try_minutes(n),
            "h" => Duration::try_hours(n),
            "d" => Duration::try_days(n),
            "w" => Duration::try_weeks(n),
            unit => {
                let n = u32::try_from(n).map_err(|_| invalid())?;
                let months = if unit == "y" {
                    n.checked_mul(12).ok_or_else(invalid)?
                } else {
                    n
                };
                offset.months = offset.months.checked_add(months).ok_or_else(invalid)?;
                continue;
            }
        };
        offset.fixed = fixed
            .and_then(|d| offset.fixed.checked_add(&d))
            .ok_or_else(invalid)?;
    }

    if consumed == 0 || consumed != s.len() {
        return Err(invalid());
    }

    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        // 2017-07-14T02:40:00Z
        Utc.timestamp_opt(1_500_000_000, 0).unwrap()
    }

    // ===================================================================
    // Endpoint parsing
    // ===================================================================

    #[test]
    fn test_now() {
        assert_eq!(parse_endpoint("now", fixed_now()).unwrap(), fixed_now());
    }

    #[test]
    fn test_bare_offset_points_into_past() {
        let t = parse_endpoint("5m", fixed_now()).unwrap();
        assert_eq!(fixed_now() - t, Duration::minutes(5));
    }

    #[test]
    fn test_anchored_offsets() {
        let past = parse_endpoint("now-1h", fixed_now()).unwrap();
        assert_eq!(fixed_now() - past, Duration::hours(1));

        let future = parse_endpoint("now+2d", fixed_now()).unwrap();
        assert_eq!(future - fixed_now(), Duration::days(2));
    }

    #[test]
    fn test_compound_offset() {
        let t = parse_endpoint("1h30m", fixed_now()).unwrap();
        assert_eq!(fixed_now() - t, Duration::minutes(90));
    }

    #[test]
    fn test_millisecond_offset() {
        let t = parse_endpoint("now-200ms", fixed_now()).unwrap();
        assert_eq!(fixed_now() - t, Duration::milliseconds(200));
    }

    #[test]
    fn test_calendar_month_offset() {
        let t = parse_endpoint("now-1M", fixed_now()).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2017, 6, 14, 2, 40, 0).unwrap());

        let t = parse_endpoint("now-1y", fixed_now()).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2016, 7, 14, 2, 40, 0).unwrap());
    }

    #[test]
    fn test_epoch_millis() {
        let t = parse_endpoint("1500000000000", fixed_now()).unwrap();
        assert_eq!(t, fixed_now());
    }

    #[test]
    fn test_rfc3339() {
        let t = parse_endpoint("2017-07-14T02:40:00Z", Utc::now()).unwrap();
        assert_eq!(t, fixed_now());
    }

    #[test]
    fn test_invalid_expressions() {
        for raw in ["", "soon", "5x", "now-", "m5", "5m garbage", "now-5m-"] {
            let err = parse_endpoint(raw, fixed_now()).unwrap_err();
            assert!(
                matches!(err, Error::InvalidTimeRange(_)),
                "expected InvalidTimeRange for {:?}",
                raw
            );
        }
    }

    // ===================================================================
    // TimeRange
    // ===================================================================

    #[test]
    fn test_relative_range_bounds() {
        let range = TimeRange::with_now("5m", "now", fixed_now());
        let (from, to) = range.bounds_ms().unwrap();
        assert_eq!(to, 1_500_000_000_000);
        assert_eq!(to - from, 5 * 60 * 1000);
        assert_eq!(range.from_ms().unwrap(), from);
        assert_eq!(range.to_ms().unwrap(), to);
    }

    #[test]
    fn test_reversed_range_rejected() {
        let range = TimeRange::with_now("now", "1h", fixed_now());
        assert!(matches!(
            range.resolve().unwrap_err(),
            Error::InvalidTimeRange(_)
        ));
    }

    #[test]
    fn test_zero_length_range() {
        let range = TimeRange::from_epoch_millis(1_500_000_000_000, 1_500_000_000_000);
        assert_eq!(range.span().unwrap(), Duration::zero());
    }
}
