//! Request building: filter clause, aggregation tree, and `_msearch` framing

pub mod aggs;
pub mod filter;
pub mod request;
pub mod types;

pub use aggs::AggregationBuilder;
pub use filter::FilterBuilder;
pub use request::{build_batch, MSearchSegment};
