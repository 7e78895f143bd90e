//! Backend-version dependent request details
//!
//! Elasticsearch renamed a handful of request keys across major versions.
//! Rather than comparing version numbers throughout the builders, the
//! datasource version is turned into a `Capabilities` value once and handed
//! to the sites that care.
//!
//! Versions use the datasource numbering: `2`, `5`, `56` (5.6), `60`, `70`.

/// Version-derived switches for request generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    version: i32,
}

impl Capabilities {
    pub fn for_version(version: i32) -> Self {
        Self { version }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Multi-search `search_type`; the `count` type was removed in 5.0
    pub fn search_type(&self) -> &'static str {
        if self.version < 5 {
            "count"
        } else {
            "query_then_fetch"
        }
    }

    /// `max_concurrent_shard_requests` is understood from 5.6
    pub fn supports_max_concurrent_shard_requests(&self) -> bool {
        self.version >= 56
    }

    /// Terms ordering key for "by term"; `_term` became `_key` in 6.0
    pub fn terms_order_term_key(&self) -> &'static str {
        if self.version >= 60 {
            "_key"
        } else {
            "_term"
        }
    }

    /// Inline script body key; `inline` became `source` in 6.0
    pub fn script_key(&self) -> ScriptKey {
        if self.version >= 60 {
            ScriptKey::Source
        } else {
            ScriptKey::Inline
        }
    }

    /// Date histogram interval key
    ///
    /// 7.0 split `interval` into `calendar_interval` for month, quarter and
    /// year units (and a single week) and `fixed_interval` for everything else.
    pub fn date_histogram_interval_key(&self, interval: &str) -> IntervalKey {
        if self.version < 70 {
            return IntervalKey::Interval;
        }
        if is_calendar_interval(interval) {
            IntervalKey::CalendarInterval
        } else {
            IntervalKey::FixedInterval
        }
    }
}

fn is_calendar_interval(interval: &str) -> bool {
    let interval = interval.trim();
    let split = interval
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(interval.len());
    let (count, unit) = interval.split_at(split);

    match unit {
        "M" | "q" | "y" => true,
        "w" => count.is_empty() || count == "1",
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKey {
    Inline,
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKey {
    Interval,
    FixedInterval,
    CalendarInterval,
}
