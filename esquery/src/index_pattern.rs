//! Time-partitioned index name resolution
//!
//! Index patterns combine bracketed literal text with moment-style date tokens,
//! e.g. `[logstash-]YYYY.MM.DD` or `YYYY.MM[-metrics]`. Given a rotation
//! interval and a time range, every rotation bucket the range touches is
//! formatted through the pattern, producing the list of physical indices to
//! search in chronological order.

use crate::error::{Error, Result};
use crate::time_range::TimeRange;
use chrono::{DateTime, Datelike, Days, Months, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rotation interval of a time-partitioned index family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexInterval {
    /// Pattern is an index name (or wildcard) used verbatim
    #[default]
    None,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl IndexInterval {
    /// Start of the following rotation bucket
    ///
    /// `None` has no successor.
    pub fn next(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            IndexInterval::None => None,
            IndexInterval::Hourly => dt.checked_add_signed(chrono::Duration::hours(1)),
            IndexInterval::Daily => dt.checked_add_days(Days::new(1)),
            IndexInterval::Weekly => dt.checked_add_days(Days::new(7)),
            IndexInterval::Monthly => dt.checked_add_months(Months::new(1)),
            IndexInterval::Yearly => dt.checked_add_months(Months::new(12)),
        }
    }
}

impl fmt::Display for IndexInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexInterval::None => write!(f, "none"),
            IndexInterval::Hourly => write!(f, "hourly"),
            IndexInterval::Daily => write!(f, "daily"),
            IndexInterval::Weekly => write!(f, "weekly"),
            IndexInterval::Monthly => write!(f, "monthly"),
            IndexInterval::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for IndexInterval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(IndexInterval::None),
            "hourly" => Ok(IndexInterval::Hourly),
            "daily" => Ok(IndexInterval::Daily),
            "weekly" => Ok(IndexInterval::Weekly),
            "monthly" => Ok(IndexInterval::Monthly),
            "yearly" => Ok(IndexInterval::Yearly),
            _ => Err(Error::UnsupportedIntervalFormat(s.to_string())),
        }
    }
}

/// A single date field in a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateToken {
    Year4,
    Year2,
    IsoYear4,
    IsoYear2,
    MonthName,
    MonthAbbrev,
    Month2,
    Month,
    DayOfYear3,
    DayOfYear,
    Day2,
    Day,
    WeekdayName,
    WeekdayAbbrev,
    WeekdayMin,
    WeekdayFromSunday,
    IsoWeekday,
    IsoWeek2,
    IsoWeek,
    Hour2,
    Hour,
    Hour12Padded,
    Hour12,
    Minute2,
    Minute,
    Second2,
    Second,
    MeridiemUpper,
    MeridiemLower,
    UnixSeconds,
}

/// Recognized tokens, longest first so that greedy matching works
const TOKENS: &[(&str, DateToken)] = &[
    ("YYYY", DateToken::Year4),
    ("GGGG", DateToken::IsoYear4),
    ("MMMM", DateToken::MonthName),
    ("DDDD", DateToken::DayOfYear3),
    ("dddd", DateToken::WeekdayName),
    ("MMM", DateToken::MonthAbbrev),
    ("DDD", DateToken::DayOfYear),
    ("ddd", DateToken::WeekdayAbbrev),
    ("YY", DateToken::Year2),
    ("GG", DateToken::IsoYear2),
    ("MM", DateToken::Month2),
    ("DD", DateToken::Day2),
    ("dd", DateToken::WeekdayMin),
    ("WW", DateToken::IsoWeek2),
    ("HH", DateToken::Hour2),
    ("hh", DateToken::Hour12Padded),
    ("mm", DateToken::Minute2),
    ("ss", DateToken::Second2),
    ("M", DateToken::Month),
    ("D", DateToken::Day),
    ("d", DateToken::WeekdayFromSunday),
    ("E", DateToken::IsoWeekday),
    ("W", DateToken::IsoWeek),
    ("H", DateToken::Hour),
    ("h", DateToken::Hour12),
    ("m", DateToken::Minute),
    ("s", DateToken::Second),
    ("A", DateToken::MeridiemUpper),
    ("a", DateToken::MeridiemLower),
    ("X", DateToken::UnixSeconds),
];

impl DateToken {
    fn render(&self, dt: &DateTime<Utc>, out: &mut String) {
        use std::fmt::Write;

        // Writing into a String cannot fail
        let _ = match self {
            DateToken::Year4 => write!(out, "{:04}", dt.year()),
            DateToken::Year2 => write!(out, "{:02}", dt.year().rem_euclid(100)),
            DateToken::IsoYear4 => write!(out, "{:04}", dt.iso_week().year()),
            DateToken::IsoYear2 => write!(out, "{:02}", dt.iso_week().year().rem_euclid(100)),
            DateToken::MonthName => write!(out, "{}", dt.format("%B")),
            DateToken::MonthAbbrev => write!(out, "{}", dt.format("%b")),
            DateToken::Month2 => write!(out, "{:02}", dt.month()),
            DateToken::Month => write!(out, "{}", dt.month()),
            DateToken::DayOfYear3 => write!(out, "{:03}", dt.ordinal()),
            DateToken::DayOfYear => write!(out, "{}", dt.ordinal()),
            DateToken::Day2 => write!(out, "{:02}", dt.day()),
            DateToken::Day => write!(out, "{}", dt.day()),
            DateToken::WeekdayName => write!(out, "{}", dt.format("%A")),
            DateToken::WeekdayAbbrev => write!(out, "{}", dt.format("%a")),
            DateToken::WeekdayMin => {
                let abbrev = dt.format("%a").to_string();
                write!(out, "{}", &abbrev[..2])
            }
            DateToken::WeekdayFromSunday => {
                write!(out, "{}", dt.weekday().num_days_from_sunday())
            }
            DateToken::IsoWeekday => write!(out, "{}", dt.weekday().number_from_monday()),
            DateToken::IsoWeek2 => write!(out, "{:02}", dt.iso_week().week()),
            DateToken::IsoWeek => write!(out, "{}", dt.iso_week().week()),
            DateToken::Hour2 => write!(out, "{:02}", dt.hour()),
            DateToken::Hour => write!(out, "{}", dt.hour()),
            DateToken::Hour12Padded => write!(out, "{:02}", dt.hour12().1),
            DateToken::Hour12 => write!(out, "{}", dt.hour12().1),
            DateToken::Minute2 => write!(out, "{:02}", dt.minute()),
            DateToken::Minute => write!(out, "{}", dt.minute()),
            DateToken::Second2 => write!(out, "{:02}", dt.second()),
            DateToken::Second => write!(out, "{}", dt.second()),
            DateToken::MeridiemUpper => out.write_str(if dt.hour12().0 { "PM" } else { "AM" }),
            DateToken::MeridiemLower => out.write_str(if dt.hour12().0 { "pm" } else { "am" }),
            DateToken::UnixSeconds => write!(out, "{}", dt.timestamp()),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(DateToken),
}

/// Upper bound on the number of indices a single range may resolve to
pub const MAX_INDICES: usize = 100_000;

/// An index naming pattern together with its rotation interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPattern {
    raw: String,
    interval: IndexInterval,
    segments: Vec<Segment>,
}

impl IndexPattern {
    /// Parse a pattern for the given interval
    ///
    /// With `IndexInterval::None` the pattern is kept as an opaque name and
    /// never parsed.
    pub fn new(raw: impl Into<String>, interval: IndexInterval) -> Result<Self> {
        let raw = raw.into();
        let segments = match interval {
            IndexInterval::None => vec![Segment::Literal(raw.clone())],
            _ => parse_segments(&raw)?,
        };

        Ok(Self {
            raw,
            interval,
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn interval(&self) -> IndexInterval {
        self.interval
    }

    /// Render the pattern for one instant
    pub fn format(&self, dt: &DateTime<Utc>) -> String {
        let mut out = String::with_capacity(self.raw.len() + 8);
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Token(token) => token.render(dt, &mut out),
            }
        }
        out
    }

    /// Every index the range touches, ascending and without repeats
    ///
    /// The walk starts at the range start and takes whole rotation steps
    /// until it reaches the range end, so the last step may land past it.
    pub fn indices(&self, range: &TimeRange) -> Result<Vec<String>> {
        if self.interval == IndexInterval::None {
            return Ok(vec![self.raw.clone()]);
        }

        let (from, to) = range.resolve()?;
        let mut cursor = from;
        let mut names = vec![self.format(&cursor)];

        while cursor < to {
            cursor = self.interval.next(cursor).ok_or_else(|| {
                Error::InvalidTimeRange(format!(
                    "{} step past {} overflows",
                    self.interval, cursor
                ))
            })?;

            let name = self.format(&cursor);
            if names.last() != Some(&name) {
                if names.len() >= MAX_INDICES {
                    return Err(Error::InvalidTimeRange(format!(
                        "range spans more than {} {} indices",
                        MAX_INDICES, self.interval
                    )));
                }
                names.push(name);
            }
        }

        tracing::debug!(
            pattern = %self.raw,
            interval = %self.interval,
            count = names.len(),
            "resolved index list"
        );

        Ok(names)
    }

    /// Comma-joined index list, ready for a request header
    pub fn resolve(&self, range: &TimeRange) -> Result<String> {
        Ok(self.indices(range)?.join(","))
    }
}

/// Resolve `pattern` under the textual rotation `interval` into a
/// comma-separated index list
pub fn resolve(pattern: &str, interval: &str, range: &TimeRange) -> Result<String> {
    let interval: IndexInterval = interval.parse()?;
    IndexPattern::new(pattern, interval)?.resolve(range)
}

fn parse_segments(raw: &str) -> Result<Vec<Segment>> {
    let malformed = |reason: String| Error::MalformedIndexPattern(format!("{}: {}", raw, reason));

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            let close = rest
                .find(']')
                .ok_or_else(|| malformed("unclosed '['".to_string()))?;
            literal.push_str(&rest[1..close]);
            rest = &rest[close + 1..];
        } else if c == ']' {
            return Err(malformed("unmatched ']'".to_string()));
        } else if c.is_ascii_alphabetic() {
            let (text, token) = TOKENS
                .iter()
                .find(|(text, _)| rest.starts_with(text))
                .ok_or_else(|| {
                    malformed(format!(
                        "'{}' is not a date token; wrap literal text in brackets",
                        c
                    ))
                })?;
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Token(*token));
            rest = &rest[text.len()..];
        } else {
            literal.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    if !segments.iter().any(|s| matches!(s, Segment::Token(_))) {
        return Err(malformed("no date token".to_string()));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    // ===================================================================
    // IndexInterval parsing
    // ===================================================================

    #[test]
    fn test_interval_from_str() {
        assert_eq!("Daily".parse::<IndexInterval>().unwrap(), IndexInterval::Daily);
        assert_eq!("HOURLY".parse::<IndexInterval>().unwrap(), IndexInterval::Hourly);
        assert_eq!("".parse::<IndexInterval>().unwrap(), IndexInterval::None);
        assert_eq!("none".parse::<IndexInterval>().unwrap(), IndexInterval::None);
        assert!(matches!(
            "fortnightly".parse::<IndexInterval>(),
            Err(Error::UnsupportedIntervalFormat(s)) if s == "fortnightly"
        ));
    }

    // ===================================================================
    // Step
    // ===================================================================

    #[test]
    fn test_next_month_handles_short_months() {
        let next = IndexInterval::Monthly.next(at(2017, 1, 1, 0, 0)).unwrap();
        assert_eq!(next, at(2017, 2, 1, 0, 0));
        let next = IndexInterval::Monthly.next(next).unwrap();
        assert_eq!(next, at(2017, 3, 1, 0, 0));
        assert!(IndexInterval::None.next(next).is_none());
    }

    // ===================================================================
    // Pattern parsing and formatting
    // ===================================================================

    #[test]
    fn test_prefix_pattern() {
        let p = IndexPattern::new("[logstash-]YYYY.MM.DD", IndexInterval::Daily).unwrap();
        assert_eq!(p.format(&at(2017, 7, 4, 2, 40)), "logstash-2017.07.04");
    }

    #[test]
    fn test_suffix_pattern() {
        let p = IndexPattern::new("YYYY.MM[-metrics]", IndexInterval::Monthly).unwrap();
        assert_eq!(p.format(&at(2017, 7, 4, 2, 40)), "2017.07-metrics");
    }

    #[test]
    fn test_iso_week_tokens() {
        let p = IndexPattern::new("[logs-]GGGG.WW", IndexInterval::Weekly).unwrap();
        // 2021-01-01 belongs to ISO week 53 of 2020
        assert_eq!(p.format(&at(2021, 1, 1, 0, 0)), "logs-2020.53");

        let p = IndexPattern::new("[logs-]YYYY.W", IndexInterval::Weekly).unwrap();
        assert_eq!(p.format(&at(2017, 1, 4, 0, 0)), "logs-2017.1");
    }

    #[test]
    fn test_unpadded_and_named_tokens() {
        let p = IndexPattern::new("[x-]YY.M.D.H", IndexInterval::Hourly).unwrap();
        assert_eq!(p.format(&at(2017, 7, 4, 2, 40)), "x-17.7.4.2");

        let p = IndexPattern::new("[x-]MMM.ddd", IndexInterval::Daily).unwrap();
        assert_eq!(p.format(&at(2017, 7, 14, 0, 0)), "x-Jul.Fri");

        let p = IndexPattern::new("[x-]DDDD", IndexInterval::Daily).unwrap();
        assert_eq!(p.format(&at(2017, 2, 1, 0, 0)), "x-032");
    }

    #[test]
    fn test_bracketed_literal_between_tokens() {
        let p = IndexPattern::new("YYYY[-week-]WW", IndexInterval::Weekly).unwrap();
        assert_eq!(p.format(&at(2017, 7, 14, 0, 0)), "2017-week-28");
    }

    #[test]
    fn test_malformed_patterns() {
        for raw in ["logstash-YYYY", "[logstash-]", "[logstash-YYYY", "logs]YYYY", ""] {
            assert!(
                matches!(
                    IndexPattern::new(raw, IndexInterval::Daily),
                    Err(Error::MalformedIndexPattern(_))
                ),
                "expected MalformedIndexPattern for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_no_interval_keeps_pattern_verbatim() {
        let p = IndexPattern::new("logstash-*", IndexInterval::None).unwrap();
        let range = TimeRange::new("1h", "now");
        assert_eq!(p.resolve(&range).unwrap(), "logstash-*");
    }

    // ===================================================================
    // Boundary walking
    // ===================================================================

    #[test]
    fn test_empty_range_yields_single_index() {
        let at_ms = at(2017, 7, 14, 2, 40).timestamp_millis();
        let range = TimeRange::from_epoch_millis(at_ms, at_ms);
        let p = IndexPattern::new("[logs-]YYYY.MM.DD", IndexInterval::Daily).unwrap();
        assert_eq!(p.indices(&range).unwrap(), vec!["logs-2017.07.14"]);
    }

    #[test]
    fn test_last_step_lands_past_range_end() {
        let range = TimeRange::from_epoch_millis(
            at(2017, 7, 14, 2, 40).timestamp_millis(),
            at(2017, 7, 14, 2, 45).timestamp_millis(),
        );
        let p = IndexPattern::new("[logs-]YYYY.MM.DD", IndexInterval::Daily).unwrap();
        assert_eq!(
            p.indices(&range).unwrap(),
            vec!["logs-2017.07.14", "logs-2017.07.15"]
        );
    }

    #[test]
    fn test_walk_is_capped() {
        let range = TimeRange::from_epoch_millis(
            at(2000, 1, 1, 0, 0).timestamp_millis(),
            at(2020, 1, 1, 0, 0).timestamp_millis(),
        );
        let p = IndexPattern::new("[logs-]YYYY.MM.DD.HH", IndexInterval::Hourly).unwrap();
        assert!(matches!(p.indices(&range), Err(Error::InvalidTimeRange(_))));

        let yearly = IndexPattern::new("[logs-]YYYY", IndexInterval::Yearly).unwrap();
        assert_eq!(yearly.indices(&range).unwrap().len(), 21);
    }

    #[test]
    fn test_coarse_pattern_deduplicates() {
        // daily rotation, monthly name: 10 days inside July collapse to one
        let range = TimeRange::from_epoch_millis(
            at(2017, 7, 14, 0, 0).timestamp_millis(),
            at(2017, 7, 24, 0, 0).timestamp_millis(),
        );
        let p = IndexPattern::new("[logs-]YYYY.MM", IndexInterval::Daily).unwrap();
        assert_eq!(p.indices(&range).unwrap(), vec!["logs-2017.07"]);
    }

    #[test]
    fn test_resolve_rejects_unknown_interval() {
        let range = TimeRange::new("1h", "now");
        assert!(matches!(
            resolve("[logs-]YYYY", "Biweekly", &range),
            Err(Error::UnsupportedIntervalFormat(_))
        ));
    }
}
