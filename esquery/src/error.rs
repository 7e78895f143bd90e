//! Error types for query building and index resolution

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Metric '{metric}' references unknown metric '{reference}'")]
    UnresolvedPipelineReference { metric: String, reference: String },

    #[error("Unsupported index interval: {0}")]
    UnsupportedIntervalFormat(String),

    #[error("Malformed index pattern: {0}")]
    MalformedIndexPattern(String),

    #[error("Unsupported aggregation: {0}")]
    UnsupportedAggregation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Stable machine-readable code for the error kind
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidTimeRange(_) => "invalid_time_range",
            Self::UnresolvedPipelineReference { .. } => "unresolved_pipeline_reference",
            Self::UnsupportedIntervalFormat(_) => "unsupported_interval_format",
            Self::MalformedIndexPattern(_) => "malformed_index_pattern",
            Self::UnsupportedAggregation(_) => "unsupported_aggregation",
            Self::InvalidQuery(_) | Self::MissingField(_) => "parsing_exception",
            Self::Config(_) | Self::TomlDe(_) | Self::TomlSer(_) => "config_exception",
            Self::Io(_) => "io_exception",
            Self::Json(_) => "parse_exception",
        }
    }

    /// Whether the error stems from datasource or query configuration
    /// rather than an environment fault.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_codes() {
        assert_eq!(
            Error::InvalidTimeRange("x".into()).error_type(),
            "invalid_time_range"
        );
        assert_eq!(
            Error::UnresolvedPipelineReference {
                metric: "3".into(),
                reference: "9".into(),
            }
            .error_type(),
            "unresolved_pipeline_reference"
        );
        assert_eq!(
            Error::MalformedIndexPattern("logs".into()).error_type(),
            "malformed_index_pattern"
        );
    }

    #[test]
    fn test_pipeline_reference_message() {
        let err = Error::UnresolvedPipelineReference {
            metric: "3".into(),
            reference: "9".into(),
        };
        assert_eq!(
            err.to_string(),
            "Metric '3' references unknown metric '9'"
        );
        assert!(err.is_configuration_error());
    }
}
