//! Elasticsearch query builder for time-series panels
//!
//! This crate turns a backend-agnostic panel query (bucket aggregations plus
//! metrics over a time range) into an Elasticsearch `_msearch` request, and
//! resolves which time-partitioned indices the request must target.
//!
//! # Request shape
//!
//! ```text
//! {"search_type":"query_then_fetch","ignore_unavailable":true,"index":"logs-2017.07.14"}
//! {"size":0,"query":{"bool":{"filter":[{"range":...},{"query_string":...}]}},"aggs":{...}}
//! ```
//!
//! # Index patterns
//!
//! Supported rotation intervals:
//! - `hourly` / `daily` / `weekly` / `monthly` / `yearly`
//! - none (the index name is used verbatim)
//!
//! # Aggregations
//!
//! Bucket aggregations:
//! - `date_histogram` / `histogram`
//! - `terms` / `filters`
//! - `geohash_grid`
//!
//! Metrics:
//! - `count` / `avg` / `sum` / `min` / `max`
//! - `extended_stats` / `percentiles` / `cardinality`
//! - `moving_avg` / `derivative` / `cumulative_sum` (pipeline)

pub mod capabilities;
pub mod config;
pub mod error;
pub mod index_pattern;
pub mod interval;
pub mod model;
pub mod query;
pub mod time_range;

pub use capabilities::Capabilities;
pub use config::DatasourceConfig;
pub use error::{Error, Result};
pub use index_pattern::{resolve, IndexInterval, IndexPattern, MAX_INDICES};
pub use interval::{Interval, IntervalCalculator};
pub use model::{BucketAgg, BucketAggType, Metric, MetricType, Query, Settings};
pub use query::{build_batch, MSearchSegment};
pub use time_range::TimeRange;
