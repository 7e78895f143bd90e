//! Multi-search request assembly
//!
//! A built query is one `_msearch` segment: a header line naming the target
//! indices, then the search body. Segments from several queries can be
//! concatenated into a single `_msearch` payload.

use crate::config::DatasourceConfig;
use crate::error::Result;
use crate::interval::parse_interval;
use crate::model::Query;
use crate::query::aggs::AggregationBuilder;
use crate::query::filter::FilterBuilder;
use crate::query::types::{MSearchHeader, SearchRequest};
use crate::time_range::TimeRange;

/// Header and body of one multi-search request
#[derive(Debug, Clone)]
pub struct MSearchSegment {
    pub header: MSearchHeader,
    pub body: SearchRequest,
}

impl MSearchSegment {
    /// `header\nbody\n`, both compact JSON
    pub fn to_ndjson(&self) -> Result<String> {
        let header = serde_json::to_string(&self.header)?;
        let body = serde_json::to_string(&self.body)?;
        Ok(format!("{}\n{}\n", header, body))
    }
}

impl Query {
    /// Build the request segment for this query against a datasource
    pub fn to_segment(&self, range: &TimeRange, ds: &DatasourceConfig) -> Result<MSearchSegment> {
        let (from_ms, to_ms) = range.bounds_ms()?;
        let caps = ds.capabilities();

        let time_field = self
            .time_field
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(ds.time_field.as_str());

        let mut calculator = ds.interval_calculator()?;
        if let Some(min) = self.interval.as_deref().filter(|s| !s.trim().is_empty()) {
            calculator = calculator.with_min_interval(parse_interval(min)?);
        }
        let interval = calculator.calculate(range)?;

        let index = ds.index_pattern()?.resolve(range)?;

        let query = FilterBuilder::new(time_field, from_ms, to_ms)
            .query(self.query_text())
            .build();

        let aggs = AggregationBuilder::new(caps, time_field, from_ms, to_ms, &interval.text)
            .build(&self.bucket_aggs, &self.metrics)?;

        let header = MSearchHeader {
            search_type: caps.search_type().to_string(),
            ignore_unavailable: true,
            index,
            max_concurrent_shard_requests: caps
                .supports_max_concurrent_shard_requests()
                .then_some(ds.max_concurrent_shard_requests),
        };

        tracing::debug!(
            "Built request for index '{}' ({} bucket aggs, {} metrics, interval {})",
            header.index,
            self.bucket_aggs.len(),
            self.metrics.len(),
            interval.text
        );

        Ok(MSearchSegment {
            header,
            body: SearchRequest {
                size: 0,
                query,
                aggs,
            },
        })
    }

    /// Build the two-line `_msearch` payload for this query
    pub fn build(&self, range: &TimeRange, ds: &DatasourceConfig) -> Result<String> {
        self.to_segment(range, ds)?.to_ndjson()
    }
}

/// Build several queries against the same range and datasource
///
/// Each query succeeds or fails on its own.
pub fn build_batch(
    queries: &[Query],
    range: &TimeRange,
    ds: &DatasourceConfig,
) -> Vec<Result<String>> {
    queries.iter().map(|q| q.build(range, ds)).collect()
}
