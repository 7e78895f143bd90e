//! Time-window and free-text filter clause

use crate::query::types::{BoolQuery, EsQuery, QueryStringQuery, RangeParams, EPOCH_MILLIS};
use std::collections::BTreeMap;

/// Builds the `bool.filter` list every request carries
///
/// The list is conjunctive and ordered: the time range first, the free-text
/// condition second. Free text goes through verbatim; any escaping is the
/// query author's.
#[derive(Debug, Clone)]
pub struct FilterBuilder<'a> {
    time_field: &'a str,
    from_ms: i64,
    to_ms: i64,
    query: &'a str,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(time_field: &'a str, from_ms: i64, to_ms: i64) -> Self {
        Self {
            time_field,
            from_ms,
            to_ms,
            query: "*",
        }
    }

    /// Free-text condition; blank text matches everything
    pub fn query(mut self, query: &'a str) -> Self {
        self.query = if query.trim().is_empty() { "*" } else { query };
        self
    }

    pub fn range_clause(&self) -> EsQuery {
        range_filter(self.time_field, self.from_ms, self.to_ms)
    }

    pub fn query_string_clause(&self) -> EsQuery {
        EsQuery::QueryString(QueryStringQuery::new(self.query))
    }

    pub fn build(&self) -> EsQuery {
        EsQuery::Bool(BoolQuery {
            filter: vec![self.range_clause(), self.query_string_clause()],
        })
    }
}

/// `{range: {<field>: {gte, lte, format: epoch_millis}}}`
pub fn range_filter(field: &str, from_ms: i64, to_ms: i64) -> EsQuery {
    let mut fields = BTreeMap::new();
    fields.insert(
        field.to_string(),
        RangeParams {
            gte: from_ms.to_string(),
            lte: to_ms.to_string(),
            format: EPOCH_MILLIS.to_string(),
        },
    );
    EsQuery::Range(fields)
}
