use citibike_risk::{
    config::{RiskConfig, SeverityWeights},
    error::RiskError,
    risk::bucket::{Granularity, TimeBucketer},
};
use chrono::NaiveDate;

fn rejects(config: RiskConfig) {
    assert!(matches!(config.validate(), Err(RiskError::Configuration(_))));
}

#[test]
fn defaults_are_valid() {
    let config = RiskConfig::default();
    config.validate().unwrap();
    assert_eq!(config.distance_threshold_m, 300.0);
    assert_eq!(config.tier_labels.len(), config.tier_quantiles.len() + 1);
}

#[test]
fn rejects_non_positive_epsilon_k_and_threshold() {
    rejects(RiskConfig { epsilon: 0.0, ..RiskConfig::default() });
    rejects(RiskConfig { eb_pseudo_count_k: -1.0, ..RiskConfig::default() });
    rejects(RiskConfig { distance_threshold_m: 0.0, ..RiskConfig::default() });
}

#[test]
fn rejects_negative_weight() {
    rejects(RiskConfig {
        severity_weights: SeverityWeights::new(1.0, -5.0, 1.0, 5.0),
        ..RiskConfig::default()
    });
}

#[test]
fn rejects_unordered_quantiles_and_label_mismatch() {
    rejects(RiskConfig {
        tier_quantiles: vec![0.5, 0.25],
        tier_labels: vec!["a".into(), "b".into(), "c".into()],
        ..RiskConfig::default()
    });
    rejects(RiskConfig {
        tier_quantiles: vec![0.5, 1.0],
        tier_labels: vec!["a".into(), "b".into(), "c".into()],
        ..RiskConfig::default()
    });
    rejects(RiskConfig {
        tier_labels: vec!["only".into()],
        ..RiskConfig::default()
    });
}

#[test]
fn granularities_produce_expected_keys() {
    // 2024-05-04 is a Saturday
    let ts = NaiveDate::from_ymd_opt(2024, 5, 4)
        .unwrap()
        .and_hms_opt(7, 15, 0)
        .unwrap();
    assert_eq!(Granularity::Date.bucket(&ts), "2024-05-04");
    assert_eq!(Granularity::Month.bucket(&ts), "2024-05");
    assert_eq!(Granularity::Hour.bucket(&ts), "07");
    assert_eq!(Granularity::Weekday.bucket(&ts), "Sat");
    assert_eq!(Granularity::WeekdayHour.bucket(&ts), "Sat-07");
    assert_eq!(Granularity::DayType.bucket(&ts), "weekend");
    assert_eq!(Granularity::All.bucket(&ts), "all");
    assert_eq!("weekday-hour".parse::<Granularity>().unwrap(), Granularity::WeekdayHour);
}
