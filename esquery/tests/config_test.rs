//! Tests for datasource config loading

use esquery::{DatasourceConfig, Error, IndexInterval};
use tempfile::tempdir;

#[test]
fn test_save_and_load() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("nested").join("datasource.toml");

    let mut config = DatasourceConfig::new("[metrics-]YYYY.MM", 56).with_interval("monthly");
    config.time_field = "ts".to_string();
    config.time_interval = Some("10s".to_string());
    config.max_data_points = 800;
    config.save(&path).unwrap();

    let loaded = DatasourceConfig::load(&path).unwrap();
    assert_eq!(loaded.index, "[metrics-]YYYY.MM");
    assert_eq!(loaded.index_interval().unwrap(), IndexInterval::Monthly);
    assert_eq!(loaded.es_version, 56);
    assert_eq!(loaded.time_field, "ts");
    assert_eq!(loaded.time_interval.as_deref(), Some("10s"));
    assert_eq!(loaded.max_data_points, 800);
}

#[test]
fn test_load_or_default_missing_file() {
    let temp = tempdir().unwrap();
    let config = DatasourceConfig::load_or_default(&temp.path().join("absent.toml")).unwrap();
    assert_eq!(config.index, "*");
    assert_eq!(config.es_version, 5);
}

#[test]
fn test_load_partial_file_uses_defaults() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("datasource.toml");
    std::fs::write(&path, "index = \"logs\"\nes_version = 70\n").unwrap();

    let config = DatasourceConfig::load(&path).unwrap();
    assert_eq!(config.index, "logs");
    assert_eq!(config.time_field, "@timestamp");
    assert_eq!(config.max_concurrent_shard_requests, 256);
    assert!(config.capabilities().supports_max_concurrent_shard_requests());
}

#[test]
fn test_load_rejects_invalid_config() {
    let temp = tempdir().unwrap();

    let path = temp.path().join("bad_interval.toml");
    std::fs::write(&path, "index = \"[logs-]YYYY\"\ninterval = \"quarterly\"\n").unwrap();
    let err = DatasourceConfig::load(&path).unwrap_err();
    assert!(matches!(err, Error::UnsupportedIntervalFormat(_)));
    assert!(err.is_configuration_error());

    let path = temp.path().join("bad_toml.toml");
    std::fs::write(&path, "index = [").unwrap();
    let err = DatasourceConfig::load(&path).unwrap_err();
    assert_eq!(err.error_type(), "config_exception");
}
