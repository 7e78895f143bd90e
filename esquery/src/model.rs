//! Backend-agnostic panel query model
//!
//! This is the shape the query editor produces: a flat, ordered list of bucket
//! aggregations and a flat, ordered list of metrics. Field names follow the
//! editor's JSON (`timeField`, `bucketAggs`, `pipelineAgg`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Treat an explicit `null` the same as a missing value
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Number from a JSON number or a numeric string, integers kept as integers
pub(crate) fn number_value(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .map(Number::from)
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
        }
        _ => None,
    }
}

/// Free-form named options attached to a metric or bucket aggregation
///
/// The editor stores numbers inconsistently (`10` vs `"10"`), so the numeric
/// accessors accept both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// String or number rendered as text
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Number as given, integer or fractional
    pub fn get_number(&self, key: &str) -> Option<Number> {
        self.get(key).and_then(number_value)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }
}

/// Metric aggregation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Count,
    Avg,
    Sum,
    Min,
    Max,
    ExtendedStats,
    Percentiles,
    Cardinality,
    MovingAvg,
    Derivative,
    CumulativeSum,
    RawDocument,
}

impl MetricType {
    /// Pipeline metrics read another metric instead of documents
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            MetricType::MovingAvg | MetricType::Derivative | MetricType::CumulativeSum
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Count => "count",
            MetricType::Avg => "avg",
            MetricType::Sum => "sum",
            MetricType::Min => "min",
            MetricType::Max => "max",
            MetricType::ExtendedStats => "extended_stats",
            MetricType::Percentiles => "percentiles",
            MetricType::Cardinality => "cardinality",
            MetricType::MovingAvg => "moving_avg",
            MetricType::Derivative => "derivative",
            MetricType::CumulativeSum => "cumulative_sum",
            MetricType::RawDocument => "raw_document",
        }
    }
}

/// A metric definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,

    #[serde(rename = "type")]
    pub metric_type: MetricType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Id of the sibling metric a pipeline metric reads from
    #[serde(
        default,
        rename = "pipelineAgg",
        alias = "pipelineAggregate",
        skip_serializing_if = "Option::is_none"
    )]
    pub pipeline_agg: Option<String>,

    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub settings: Settings,

    /// Hidden metrics are still requested; hiding is a display concern
    #[serde(default)]
    pub hide: bool,
}

impl Metric {
    pub fn new(id: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            id: id.into(),
            metric_type,
            field: None,
            pipeline_agg: None,
            settings: Settings::new(),
            hide: false,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_pipeline_agg(mut self, id: impl Into<String>) -> Self {
        self.pipeline_agg = Some(id.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key, value);
        self
    }

    /// Field name, if set and non-empty
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref().filter(|f| !f.trim().is_empty())
    }

    /// Referenced metric id for pipeline metrics
    ///
    /// Older editor versions stored the reference in `field`.
    pub fn pipeline_reference(&self) -> Option<&str> {
        self.pipeline_agg
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.field())
    }
}

/// Bucket aggregation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketAggType {
    DateHistogram,
    Histogram,
    Terms,
    Filters,
    GeohashGrid,
}

impl BucketAggType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketAggType::DateHistogram => "date_histogram",
            BucketAggType::Histogram => "histogram",
            BucketAggType::Terms => "terms",
            BucketAggType::Filters => "filters",
            BucketAggType::GeohashGrid => "geohash_grid",
        }
    }
}

/// A bucket aggregation definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAgg {
    pub id: String,

    #[serde(rename = "type")]
    pub agg_type: BucketAggType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub settings: Settings,
}

impl BucketAgg {
    pub fn new(id: impl Into<String>, agg_type: BucketAggType) -> Self {
        Self {
            id: id.into(),
            agg_type,
            field: None,
            settings: Settings::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key, value);
        self
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref().filter(|f| !f.trim().is_empty())
    }
}

/// A complete panel query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Time field; falls back to the datasource default when absent
    #[serde(default, rename = "timeField", skip_serializing_if = "Option::is_none")]
    pub time_field: Option<String>,

    /// Free-text Lucene filter
    #[serde(default, rename = "query", deserialize_with = "deserialize_null_default")]
    pub raw_query: String,

    #[serde(default, rename = "bucketAggs", deserialize_with = "deserialize_null_default")]
    pub bucket_aggs: Vec<BucketAgg>,

    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub metrics: Vec<Metric>,

    /// Per-query lower bound for automatic intervals, e.g. "30s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

impl Query {
    pub fn new(time_field: impl Into<String>, raw_query: impl Into<String>) -> Self {
        Self {
            time_field: Some(time_field.into()),
            raw_query: raw_query.into(),
            ..Self::default()
        }
    }

    pub fn with_bucket_agg(mut self, agg: BucketAgg) -> Self {
        self.bucket_aggs.push(agg);
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Free text with the match-all default applied
    pub fn query_text(&self) -> &str {
        let trimmed = self.raw_query.trim();
        if trimmed.is_empty() {
            "*"
        } else {
            &self.raw_query
        }
    }
}
