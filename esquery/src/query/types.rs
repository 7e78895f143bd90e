//! Elasticsearch Query DSL types
//!
//! These types represent the subset of the search DSL that esquery emits.
//! They are output-only: every struct serializes to exactly the keys the
//! backend expects, with optional keys skipped rather than sent as `null`.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Format marker sent with every epoch-millisecond bound
pub const EPOCH_MILLIS: &str = "epoch_millis";

/// Aggregations keyed by id
pub type Aggs = BTreeMap<String, Aggregation>;

/// Multi-search header line
#[derive(Debug, Clone, Serialize)]
pub struct MSearchHeader {
    pub search_type: String,
    pub ignore_unavailable: bool,
    pub index: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_shard_requests: Option<u32>,
}

/// Search request body line
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    /// Always 0; only aggregation results are requested
    pub size: u32,
    pub query: EsQuery,
    pub aggs: Aggs,
}

/// Query clauses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EsQuery {
    /// Bool query (filter context only)
    Bool(BoolQuery),

    /// Range query on a single field
    Range(BTreeMap<String, RangeParams>),

    /// Query string (Lucene syntax)
    QueryString(QueryStringQuery),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolQuery {
    pub filter: Vec<EsQuery>,
}

/// Range bounds; epoch millis are sent as strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeParams {
    pub gte: String,
    pub lte: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryStringQuery {
    pub query: String,
    pub analyze_wildcard: bool,
}

impl QueryStringQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            analyze_wildcard: true,
        }
    }
}

/// One node of the aggregation tree: the aggregation itself plus its children
///
/// Serializes as `{"<type>": {...}, "aggs": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    #[serde(flatten)]
    pub kind: AggregationKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<Aggs>,
}

impl Aggregation {
    /// Leaf node, no `aggs` key
    pub fn leaf(kind: AggregationKind) -> Self {
        Self { kind, aggs: None }
    }

    /// Bucket node; `aggs` is emitted even when empty
    pub fn bucket(kind: AggregationKind, aggs: Aggs) -> Self {
        Self {
            kind,
            aggs: Some(aggs),
        }
    }
}

/// ES aggregation types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    // Bucket aggregations
    DateHistogram(DateHistogramAgg),
    Histogram(HistogramAgg),
    Terms(TermsAgg),
    Filters(FiltersAgg),
    GeohashGrid(GeohashGridAgg),

    // Metric aggregations
    Avg(FieldMetricAgg),
    Sum(FieldMetricAgg),
    Min(FieldMetricAgg),
    Max(FieldMetricAgg),
    ExtendedStats(FieldMetricAgg),
    Percentiles(FieldMetricAgg),
    Cardinality(FieldMetricAgg),

    // Pipeline aggregations
    MovingAvg(MovingAvgAgg),
    Derivative(DerivativeAgg),
    CumulativeSum(PipelineAgg),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateHistogramAgg {
    pub field: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_interval: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_interval: Option<String>,

    pub min_doc_count: i64,
    pub extended_bounds: ExtendedBounds,
    pub format: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Histogram bounds; epoch millis are sent as strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedBounds {
    pub min: String,
    pub max: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramAgg {
    pub field: String,

    /// Integer or fractional bucket width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Number>,

    pub min_doc_count: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsAgg {
    pub field: String,
    pub size: i64,
    pub order: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiltersAgg {
    pub filters: BTreeMap<String, EsQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeohashGridAgg {
    pub field: String,
    pub precision: i64,
}

/// Metric computed over a document field or script
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldMetricAgg {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub percents: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision_threshold: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma: Option<Value>,
}

/// Inline script body; the key name depends on the backend version
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    Inline(String),
    Source(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAvgAgg {
    pub buckets_path: String,
    pub window: i64,
    pub model: String,
    pub minimize: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub predict: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivativeAgg {
    pub buckets_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineAgg {
    pub buckets_path: String,
}
