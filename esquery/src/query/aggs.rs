//! Aggregation tree builder
//!
//! Turns the flat, ordered bucket aggregation and metric lists of a
//! [`Query`](crate::model::Query) into the nested `aggs` object of a search
//! request. Bucket aggregations nest in declaration order, outermost first,
//! and the metrics become the leaves of the innermost bucket:
//!
//! ```text
//! bucketAggs = [terms "4", date_histogram "2"], metrics = [sum "1"]
//!
//! "4": { terms, aggs: { "2": { date_histogram, aggs: { "1": { sum } } } } }
//! ```
//!
//! Every bucket level carries an `aggs` object even when it is empty.
//! Version-dependent key names are taken from [`Capabilities`] at the sites
//! that need them.

use crate::capabilities::{Capabilities, IntervalKey, ScriptKey};
use crate::error::{Error, Result};
use crate::model::{number_value, BucketAgg, BucketAggType, Metric, MetricType, Settings};
use crate::query::types::*;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Default `terms` result size
pub const DEFAULT_TERMS_SIZE: i64 = 500;

/// Default `geohash_grid` precision
pub const DEFAULT_GEOHASH_PRECISION: i64 = 3;

/// Default `moving_avg` window
pub const DEFAULT_MOVING_AVG_WINDOW: i64 = 5;

/// Interval values replaced by the calculated interval
const AUTO_INTERVALS: &[&str] = &["auto", "$__interval"];

/// Builds the aggregation tree for one request
#[derive(Debug, Clone)]
pub struct AggregationBuilder<'a> {
    caps: Capabilities,
    time_field: &'a str,
    from_ms: i64,
    to_ms: i64,
    auto_interval: &'a str,
}

impl<'a> AggregationBuilder<'a> {
    /// `auto_interval` is the formatted interval used for `auto` date histograms
    pub fn new(
        caps: Capabilities,
        time_field: &'a str,
        from_ms: i64,
        to_ms: i64,
        auto_interval: &'a str,
    ) -> Self {
        Self {
            caps,
            time_field,
            from_ms,
            to_ms,
            auto_interval,
        }
    }

    /// Build the `aggs` object for the given bucket aggregations and metrics
    pub fn build(&self, bucket_aggs: &[BucketAgg], metrics: &[Metric]) -> Result<Aggs> {
        let leaves = self.metric_leaves(metrics)?;
        self.build_level(bucket_aggs, metrics, leaves)
    }

    fn build_level(
        &self,
        bucket_aggs: &[BucketAgg],
        metrics: &[Metric],
        leaves: Aggs,
    ) -> Result<Aggs> {
        let Some((outer, inner)) = bucket_aggs.split_first() else {
            return Ok(leaves);
        };

        let children = self.build_level(inner, metrics, leaves)?;
        let node = self.bucket_node(outer, metrics, children)?;

        let mut aggs = Aggs::new();
        aggs.insert(outer.id.clone(), node);
        Ok(aggs)
    }

    // ========================================================================
    // Bucket aggregations
    // ========================================================================

    fn bucket_node(
        &self,
        agg: &BucketAgg,
        metrics: &[Metric],
        mut children: Aggs,
    ) -> Result<Aggregation> {
        let kind = match agg.agg_type {
            BucketAggType::DateHistogram => {
                AggregationKind::DateHistogram(self.date_histogram(agg))
            }
            BucketAggType::Histogram => AggregationKind::Histogram(histogram(agg)?),
            BucketAggType::Terms => {
                AggregationKind::Terms(self.terms(agg, metrics, &mut children)?)
            }
            BucketAggType::Filters => AggregationKind::Filters(filters(&agg.settings)),
            BucketAggType::GeohashGrid => AggregationKind::GeohashGrid(GeohashGridAgg {
                field: required_field(agg)?,
                precision: agg
                    .settings
                    .get_i64("precision")
                    .unwrap_or(DEFAULT_GEOHASH_PRECISION),
            }),
        };

        Ok(Aggregation::bucket(kind, children))
    }

    fn date_histogram(&self, agg: &BucketAgg) -> DateHistogramAgg {
        let interval = agg.settings.get_str("interval").map(|raw| {
            if AUTO_INTERVALS.contains(&raw) {
                self.auto_interval.to_string()
            } else {
                raw.to_string()
            }
        });

        let mut body = DateHistogramAgg {
            field: agg.field().unwrap_or(self.time_field).to_string(),
            interval: None,
            fixed_interval: None,
            calendar_interval: None,
            min_doc_count: agg.settings.get_i64("min_doc_count").unwrap_or(0),
            extended_bounds: ExtendedBounds {
                min: self.from_ms.to_string(),
                max: self.to_ms.to_string(),
            },
            format: EPOCH_MILLIS.to_string(),
            missing: agg.settings.get("missing").cloned(),
            time_zone: agg.settings.get_string("time_zone"),
        };

        if let Some(interval) = interval {
            match self.caps.date_histogram_interval_key(&interval) {
                IntervalKey::Interval => body.interval = Some(interval),
                IntervalKey::CalendarInterval => body.calendar_interval = Some(interval),
                IntervalKey::FixedInterval => {
                    body.fixed_interval = Some(weeks_as_days(interval));
                }
            }
        }

        body
    }

    fn terms(
        &self,
        agg: &BucketAgg,
        metrics: &[Metric],
        children: &mut Aggs,
    ) -> Result<TermsAgg> {
        let settings = &agg.settings;

        let size = match settings.get("size") {
            None => DEFAULT_TERMS_SIZE,
            Some(raw) => settings.get_i64("size").unwrap_or_else(|| {
                tracing::warn!(
                    "terms aggregation '{}' has unparsable size {}, using {}",
                    agg.id,
                    raw,
                    DEFAULT_TERMS_SIZE
                );
                DEFAULT_TERMS_SIZE
            }),
        };

        let direction = settings.get_str("order").unwrap_or("desc");
        let order_by = settings.get_str("orderBy").unwrap_or("_term");

        let order_key = match order_by {
            "_term" | "_key" => self.caps.terms_order_term_key().to_string(),
            "_count" => "_count".to_string(),
            id => {
                let metric = metrics.iter().find(|m| m.id == id).ok_or_else(|| {
                    Error::InvalidQuery(format!(
                        "terms aggregation '{}' is ordered by unknown metric '{}'",
                        agg.id, id
                    ))
                })?;

                if metric.metric_type == MetricType::Count {
                    "_count".to_string()
                } else {
                    if metric.metric_type.is_pipeline() {
                        return Err(Error::InvalidQuery(format!(
                            "terms aggregation '{}' cannot be ordered by pipeline metric '{}'",
                            agg.id, metric.id
                        )));
                    }
                    let leaf = Aggregation::leaf(self.field_metric(metric)?);
                    children.entry(metric.id.clone()).or_insert(leaf);
                    metric.id.clone()
                }
            }
        };

        let mut order = BTreeMap::new();
        order.insert(order_key, direction.to_string());

        Ok(TermsAgg {
            field: required_field(agg)?,
            size,
            order,
            min_doc_count: settings.get_i64("min_doc_count"),
            missing: settings.get("missing").cloned(),
        })
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    fn metric_leaves(&self, metrics: &[Metric]) -> Result<Aggs> {
        let mut leaves = Aggs::new();
        let mut seen = HashSet::new();

        for (pos, metric) in metrics.iter().enumerate() {
            if !seen.insert(metric.id.as_str()) {
                tracing::warn!("duplicate metric id '{}', last definition wins", metric.id);
            }

            let kind = match metric.metric_type {
                MetricType::Count => continue,
                MetricType::RawDocument => {
                    return Err(Error::UnsupportedAggregation(format!(
                        "{} (metric '{}')",
                        metric.metric_type.as_str(),
                        metric.id
                    )));
                }
                t if t.is_pipeline() => self.pipeline_metric(metric, &metrics[..pos])?,
                _ => self.field_metric(metric)?,
            };

            leaves.insert(metric.id.clone(), Aggregation::leaf(kind));
        }

        Ok(leaves)
    }

    fn field_metric(&self, metric: &Metric) -> Result<AggregationKind> {
        let settings = &metric.settings;
        let script = self.script(settings);

        if metric.field().is_none() && script.is_none() {
            return Err(Error::MissingField(format!(
                "{} metric '{}' needs a field or a script",
                metric.metric_type.as_str(),
                metric.id
            )));
        }

        let mut body = FieldMetricAgg {
            field: metric.field().map(str::to_string),
            script,
            missing: settings.get("missing").cloned(),
            ..Default::default()
        };

        match metric.metric_type {
            MetricType::Percentiles => body.percents = percents(settings),
            MetricType::Cardinality => {
                body.precision_threshold = settings.get("precision_threshold").cloned()
            }
            MetricType::ExtendedStats => body.sigma = settings.get("sigma").cloned(),
            _ => {}
        }

        field_metric_kind(metric, body)
    }

    fn pipeline_metric(&self, metric: &Metric, earlier: &[Metric]) -> Result<AggregationKind> {
        let reference = metric.pipeline_reference().unwrap_or_default();
        let target = earlier
            .iter()
            .rev()
            .find(|m| m.id == reference)
            .ok_or_else(|| Error::UnresolvedPipelineReference {
                metric: metric.id.clone(),
                reference: reference.to_string(),
            })?;

        let buckets_path = if target.metric_type == MetricType::Count {
            "_count".to_string()
        } else {
            target.id.clone()
        };

        let settings = &metric.settings;
        let kind = match metric.metric_type {
            MetricType::MovingAvg => AggregationKind::MovingAvg(MovingAvgAgg {
                buckets_path,
                window: settings
                    .get_i64("window")
                    .unwrap_or(DEFAULT_MOVING_AVG_WINDOW),
                model: settings.get_str("model").unwrap_or("simple").to_string(),
                minimize: settings.get_bool("minimize").unwrap_or(false),
                predict: settings.get_i64("predict"),
                settings: settings.get_object("settings").cloned(),
            }),
            MetricType::Derivative => AggregationKind::Derivative(DerivativeAgg {
                buckets_path,
                unit: settings.get_string("unit"),
            }),
            _ => AggregationKind::CumulativeSum(PipelineAgg { buckets_path }),
        };

        Ok(kind)
    }

    fn script(&self, settings: &Settings) -> Option<Script> {
        let body = match settings.get("script")? {
            Value::String(s) => s.clone(),
            Value::Object(obj) => obj
                .get("inline")
                .or_else(|| obj.get("source"))
                .and_then(Value::as_str)?
                .to_string(),
            _ => return None,
        };
        if body.trim().is_empty() {
            return None;
        }

        Some(match self.caps.script_key() {
            ScriptKey::Inline => Script::Inline(body),
            ScriptKey::Source => Script::Source(body),
        })
    }
}

fn field_metric_kind(metric: &Metric, body: FieldMetricAgg) -> Result<AggregationKind> {
    Ok(match metric.metric_type {
        MetricType::Avg => AggregationKind::Avg(body),
        MetricType::Sum => AggregationKind::Sum(body),
        MetricType::Min => AggregationKind::Min(body),
        MetricType::Max => AggregationKind::Max(body),
        MetricType::ExtendedStats => AggregationKind::ExtendedStats(body),
        MetricType::Percentiles => AggregationKind::Percentiles(body),
        MetricType::Cardinality => AggregationKind::Cardinality(body),
        other => {
            return Err(Error::UnsupportedAggregation(format!(
                "{} is not a field metric (metric '{}')",
                other.as_str(),
                metric.id
            )))
        }
    })
}

/// Fixed intervals have no week unit; `2w` becomes `14d`
fn weeks_as_days(interval: String) -> String {
    match interval.strip_suffix('w').map(str::parse::<i64>) {
        Some(Ok(weeks)) => match weeks.checked_mul(7) {
            Some(days) => format!("{}d", days),
            None => interval,
        },
        _ => interval,
    }
}

fn histogram(agg: &BucketAgg) -> Result<HistogramAgg> {
    Ok(HistogramAgg {
        field: required_field(agg)?,
        interval: agg.settings.get_number("interval"),
        min_doc_count: agg.settings.get_i64("min_doc_count").unwrap_or(0),
        missing: agg.settings.get("missing").cloned(),
    })
}

/// Sub-filters from either `[{query, label}]` or `{label: query}`
fn filters(settings: &Settings) -> FiltersAgg {
    let mut filters = BTreeMap::new();

    let mut add = |label: &str, query: &str| {
        let query = if query.trim().is_empty() { "*" } else { query };
        let label = if label.trim().is_empty() { query } else { label };
        filters.insert(
            label.to_string(),
            EsQuery::QueryString(QueryStringQuery::new(query)),
        );
    };

    match settings.get("filters") {
        Some(Value::Array(items)) => {
            for item in items {
                let query = item.get("query").and_then(Value::as_str).unwrap_or_default();
                let label = item.get("label").and_then(Value::as_str).unwrap_or_default();
                add(label, query);
            }
        }
        Some(Value::Object(map)) => {
            for (label, query) in map {
                add(label, query.as_str().unwrap_or_default());
            }
        }
        _ => {}
    }

    FiltersAgg { filters }
}

fn percents(settings: &Settings) -> Option<Vec<Value>> {
    let items = settings.get("percents")?.as_array()?;
    Some(
        items
            .iter()
            .map(|p| number_value(p).map(Value::Number).unwrap_or_else(|| p.clone()))
            .collect(),
    )
}

fn required_field(agg: &BucketAgg) -> Result<String> {
    agg.field().map(str::to_string).ok_or_else(|| {
        Error::MissingField(format!(
            "{} aggregation '{}' needs a field",
            agg.agg_type.as_str(),
            agg.id
        ))
    })
}
