//! Index list resolution over fixed windows
//!
//! Epoch 1500000000 is 2017-07-14T02:40:00Z, a Friday in ISO week 28.

use esquery::{resolve, Error, IndexInterval, IndexPattern, TimeRange};

fn make_time(hour: i64) -> i64 {
    (1_500_000_000 + hour * 60 * 60) * 1000
}

fn index_list(pattern: &str, interval: &str, hours: i64) -> String {
    let range = TimeRange::from_epoch_millis(make_time(0), make_time(hours));
    resolve(pattern, interval, &range).unwrap()
}

#[test]
fn test_daily() {
    assert_eq!(
        index_list("[logstash-]YYYY.MM.DD", "Daily", 48),
        "logstash-2017.07.14,logstash-2017.07.15,logstash-2017.07.16"
    );
}

#[test]
fn test_hourly() {
    let list = index_list("[logstash-]YYYY.MM.DD.HH", "Hourly", 3);
    assert_eq!(list.split(',').count(), 4);
    assert!(list.starts_with("logstash-2017.07.14.02"));
    assert!(list.ends_with("logstash-2017.07.14.05"));
}

#[test]
fn test_weekly() {
    assert_eq!(
        index_list("[logstash-]YYYY.W", "Weekly", 100),
        "logstash-2017.28,logstash-2017.29"
    );
}

#[test]
fn test_monthly() {
    assert_eq!(
        index_list("[logstash-]YYYY.MM", "Monthly", 700),
        "logstash-2017.07,logstash-2017.08"
    );
}

#[test]
fn test_yearly() {
    // 10000h ends in September 2018; the second yearly step lands in 2019
    assert_eq!(
        index_list("[logstash-]YYYY", "Yearly", 10_000),
        "logstash-2017,logstash-2018,logstash-2019"
    );
}

#[test]
fn test_no_interval_is_verbatim() {
    assert_eq!(index_list("logstash-test", "", 1), "logstash-test");
    assert_eq!(index_list("logs-*", "none", 1000), "logs-*");
}

#[test]
fn test_suffix_layout() {
    assert_eq!(
        index_list("YYYY.MM.DD[-metrics]", "daily", 24),
        "2017.07.14-metrics,2017.07.15-metrics"
    );
}

#[test]
fn test_sub_interval_range_yields_one_name() {
    let range = TimeRange::from_epoch_millis(make_time(0), make_time(0));
    let pattern = IndexPattern::new("[logs-]YYYY.MM", IndexInterval::Monthly).unwrap();
    assert_eq!(pattern.indices(&range).unwrap(), vec!["logs-2017.07"]);
}

#[test]
fn test_coarse_format_deduplicates() {
    // Daily rotation formatted by month only collapses to one name per month
    assert_eq!(
        index_list("[logs-]YYYY.MM", "daily", 72),
        "logs-2017.07"
    );
}

#[test]
fn test_unknown_interval_is_error() {
    let range = TimeRange::from_epoch_millis(make_time(0), make_time(1));
    let err = resolve("[logs-]YYYY", "fortnightly", &range).unwrap_err();
    assert!(matches!(err, Error::UnsupportedIntervalFormat(_)));
}

#[test]
fn test_malformed_pattern_is_error() {
    let range = TimeRange::from_epoch_millis(make_time(0), make_time(1));
    for pattern in ["[logs-YYYY", "logs", "logs-YYYY"] {
        let err = resolve(pattern, "daily", &range).unwrap_err();
        assert!(
            matches!(err, Error::MalformedIndexPattern(_)),
            "pattern {} gave {:?}",
            pattern,
            err
        );
    }
}
