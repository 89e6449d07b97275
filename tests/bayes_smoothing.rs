use citibike_risk::{
    error::RiskError,
    risk::{
        aggregate::rollup,
        bayes::{estimate_prior, shrink, shrinkage_weight, smooth},
        estimate::{apply_raw_risk, raw_risk},
        RiskCell,
    },
};
use proptest::prelude::*;

#[test]
fn zero_exposure_cell_collapses_to_global_mean() {
    let raw = raw_risk(10.0, 0, 1.0);
    assert_eq!(raw, 10.0);
    assert_eq!(shrinkage_weight(0, 50.0), 0.0);
    assert_eq!(shrink(raw, 0, 0.2, 50.0), 0.2);
}

#[test]
fn well_exposed_cell_keeps_most_of_its_own_ratio() {
    let raw = raw_risk(10.0, 1000, 1.0);
    assert!((raw - 0.00999).abs() < 1e-5);
    let weight = shrinkage_weight(1000, 50.0);
    assert!((weight - 0.952).abs() < 1e-3);
    let smoothed = shrink(raw, 1000, 0.2, 50.0);
    assert!((smoothed - 0.0191).abs() < 1e-3, "got {smoothed}");
}

#[test]
fn exposure_far_above_k_converges_to_raw() {
    let k = 50.0;
    let exposure = (1000.0 * k) as u64;
    let raw = raw_risk(500.0, exposure, 1.0);
    let smoothed = shrink(raw, exposure, 0.2, k);
    assert!((smoothed - raw).abs() < 1e-3);
}

#[test]
fn half_shrinkage_at_exposure_k() {
    assert_eq!(shrinkage_weight(50, 50.0), 0.5);
}

#[test]
fn prior_pools_hazard_over_exposure() {
    let mut cells = vec![
        RiskCell::new("A", "2024-05-01", 9.0, 0),
        RiskCell::new("B", "2024-05-01", 1.0, 99),
    ];
    apply_raw_risk(&mut cells, 1.0);
    let prior = smooth(&mut cells, 1.0, 50.0).unwrap();
    // pooled 10 / (99 + 1), not the mean of 9.0 and 0.01
    assert!((prior.mean - 0.1).abs() < 1e-12);
    assert_eq!(prior.total_exposure, 99);
    assert_eq!(cells[0].smoothed_risk, prior.mean);
}

#[test]
fn zero_total_exposure_is_reported() {
    let cells = vec![RiskCell::new("A", "2024-05-01", 3.0, 0)];
    let err = estimate_prior(&cells, 1.0).unwrap_err();
    assert!(matches!(err, RiskError::UndefinedGlobalMean { cells: 1 }));
}

#[test]
fn smoothing_after_reaggregation_differs_from_averaging_smoothed_buckets() {
    let (epsilon, k, mu) = (1.0, 50.0, 0.05);
    let mut buckets = vec![
        RiskCell::new("A", "Mon-07", 4.0, 10),
        RiskCell::new("A", "Mon-08", 0.0, 90),
    ];
    apply_raw_risk(&mut buckets, epsilon);
    let averaged = buckets
        .iter()
        .map(|c| shrink(c.raw_risk, c.exposure, mu, k))
        .sum::<f64>()
        / buckets.len() as f64;

    let mut merged = rollup(&buckets, |c| (c.station_id.clone(), "Mon-07..09".to_string()));
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].hazard, 4.0);
    assert_eq!(merged[0].exposure, 100);
    apply_raw_risk(&mut merged, epsilon);
    let resmoothed = shrink(merged[0].raw_risk, merged[0].exposure, mu, k);

    assert!((resmoothed - averaged).abs() > 1e-3, "{resmoothed} vs {averaged}");
}

proptest! {
    #[test]
    fn smoothed_lies_between_raw_and_mean(
        hazard in 0.0f64..1_000.0,
        exposure in 0u64..100_000,
        epsilon in 0.001f64..10.0,
        k in 0.1f64..1_000.0,
        mu in 0.0f64..5.0,
    ) {
        let raw = raw_risk(hazard, exposure, epsilon);
        prop_assert!(raw >= 0.0 && raw.is_finite());
        let smoothed = shrink(raw, exposure, mu, k);
        let tol = 1e-12 * (1.0 + raw.max(mu));
        prop_assert!(smoothed >= raw.min(mu) - tol);
        prop_assert!(smoothed <= raw.max(mu) + tol);
    }

    #[test]
    fn shrinkage_weight_is_monotone_in_exposure(a in 0u64..1_000_000, b in 0u64..1_000_000, k in 0.1f64..1_000.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (wl, wh) = (shrinkage_weight(lo, k), shrinkage_weight(hi, k));
        prop_assert!((0.0..=1.0).contains(&wl));
        prop_assert!(wl <= wh);
    }
}
