//! Datasource configuration
//!
//! Describes the Elasticsearch cluster a query is built for: which index (or
//! index pattern) to target, how it rotates, and which version of the query
//! DSL to speak.
//!
//! ```toml
//! index = "[logstash-]YYYY.MM.DD"
//! interval = "daily"
//! es_version = 56
//! time_field = "@timestamp"
//! time_interval = "10s"
//! ```

use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::index_pattern::{IndexInterval, IndexPattern};
use crate::interval::{parse_interval, IntervalCalculator, DEFAULT_MIN_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasourceConfig {
    /// Index name, wildcard, or date pattern
    #[serde(default = "default_index")]
    pub index: String,

    /// Rotation interval of `index`; empty means no rotation
    #[serde(default)]
    pub interval: String,

    #[serde(default = "default_es_version")]
    pub es_version: i32,

    /// Time field used when a query does not name one
    #[serde(default = "default_time_field")]
    pub time_field: String,

    #[serde(default = "default_max_concurrent_shard_requests")]
    pub max_concurrent_shard_requests: u32,

    /// Lower bound for automatic histogram intervals, e.g. "10s"
    #[serde(default)]
    pub time_interval: Option<String>,

    /// Target bucket count for automatic histogram intervals
    #[serde(default = "default_max_data_points")]
    pub max_data_points: i64,
}

fn default_index() -> String {
    "*".to_string()
}

fn default_es_version() -> i32 {
    5
}

fn default_time_field() -> String {
    "@timestamp".to_string()
}

fn default_max_concurrent_shard_requests() -> u32 {
    256
}

fn default_max_data_points() -> i64 {
    crate::interval::DEFAULT_MAX_DATA_POINTS
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            index: default_index(),
            interval: String::new(),
            es_version: default_es_version(),
            time_field: default_time_field(),
            max_concurrent_shard_requests: default_max_concurrent_shard_requests(),
            time_interval: None,
            max_data_points: default_max_data_points(),
        }
    }
}

impl DatasourceConfig {
    /// Config for a plain index on the given version
    pub fn new(index: impl Into<String>, es_version: i32) -> Self {
        Self {
            index: index.into(),
            es_version,
            ..Self::default()
        }
    }

    /// Same config with a rotation interval
    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DatasourceConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file path, or fall back to defaults when absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No datasource config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Check settings that would otherwise only fail at build time
    pub fn validate(&self) -> Result<()> {
        if self.index.trim().is_empty() {
            return Err(Error::Config("index must not be empty".to_string()));
        }
        if self.max_data_points <= 0 {
            return Err(Error::Config(format!(
                "max_data_points must be positive, got {}",
                self.max_data_points
            )));
        }
        self.index_pattern()?;
        self.interval_calculator()?;
        Ok(())
    }

    pub fn index_interval(&self) -> Result<IndexInterval> {
        self.interval.parse()
    }

    pub fn index_pattern(&self) -> Result<IndexPattern> {
        IndexPattern::new(self.index.clone(), self.index_interval()?)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_version(self.es_version)
    }

    pub fn interval_calculator(&self) -> Result<IntervalCalculator> {
        let min_interval = match &self.time_interval {
            Some(s) if !s.trim().is_empty() => parse_interval(s)?,
            _ => DEFAULT_MIN_INTERVAL_MS,
        };
        Ok(IntervalCalculator::new(self.max_data_points, min_interval))
    }
}
